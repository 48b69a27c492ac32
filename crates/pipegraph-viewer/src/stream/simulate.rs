use pipegraph_core::{stage_key, StageStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::stream::state::{StageMap, StageNode};

pub const MIN_STEP: u32 = 5;
pub const MAX_STEP: u32 = 20;

#[derive(Debug)]
pub struct Simulator {
    rng: StdRng,
    seed_stages: Vec<String>,
}

impl Simulator {
    pub fn new(seed_stages: Vec<String>) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed_stages,
        }
    }

    pub fn seeded(seed_stages: Vec<String>, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed_stages,
        }
    }

    pub fn seed_if_empty(&self, stages: &mut StageMap) {
        if !stages.is_empty() {
            return;
        }
        for name in &self.seed_stages {
            stages.upsert(StageNode::pending(stage_key(name), name.clone()));
        }
    }

    pub fn advance(&mut self, stages: &mut StageMap) -> bool {
        for stage in stages.iter_mut() {
            if stage.status == StageStatus::Completed {
                continue;
            }
            let step = self.rng.gen_range(MIN_STEP..=MAX_STEP);
            stage.progress = (u32::from(stage.progress) + step).min(100) as u8;
            stage.status = if stage.progress >= 100 {
                StageStatus::Completed
            } else {
                StageStatus::Running
            };
        }
        stages.all_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegraph_core::NodeId;

    fn names() -> Vec<String> {
        ["IQVIA Insights", "Patent Landscape", "Clinical Trials"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn seeds_stage_ids_from_names() {
        let sim = Simulator::seeded(names(), 1);
        let mut stages = StageMap::default();
        sim.seed_if_empty(&mut stages);

        let ids: Vec<&str> = stages.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["iqvia_insights", "patent_landscape", "clinical_trials"]);
        assert!(stages.iter().all(|s| s.status == StageStatus::Pending));
    }

    #[test]
    fn progress_is_monotonic_and_terminates() {
        let mut sim = Simulator::seeded(names(), 42);
        let mut stages = StageMap::default();
        sim.seed_if_empty(&mut stages);

        let max_ticks = (100 / MIN_STEP) as usize;
        let mut prev: Vec<u8> = stages.iter().map(|s| s.progress).collect();
        let mut done = false;
        for _ in 0..max_ticks {
            done = sim.advance(&mut stages);
            let now: Vec<u8> = stages.iter().map(|s| s.progress).collect();
            for (before, after) in prev.iter().zip(&now) {
                assert!(after >= before);
                assert!(*after == 100 || after - before >= MIN_STEP as u8);
            }
            prev = now;
            if done {
                break;
            }
        }

        assert!(done);
        assert!(stages
            .iter()
            .all(|s| s.progress == 100 && s.status == StageStatus::Completed));
    }

    #[test]
    fn completed_stages_are_left_alone() {
        let mut sim = Simulator::seeded(Vec::new(), 3);
        let mut stages = StageMap::default();
        let mut done = StageNode::pending(NodeId::from("market"), "Market");
        done.status = StageStatus::Completed;
        done.progress = 100;
        stages.upsert(done.clone());
        stages.upsert(StageNode::pending(NodeId::from("web"), "Web"));

        sim.advance(&mut stages);

        assert_eq!(stages.get(&NodeId::from("market")), Some(&done));
        let web = stages.get(&NodeId::from("web")).expect("web");
        assert_eq!(web.status, StageStatus::Running);
        assert!((MIN_STEP as u8..=MAX_STEP as u8).contains(&web.progress));
    }
}
