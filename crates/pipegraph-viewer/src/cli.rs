use anyhow::Result;
use pipegraph_core::AnalysisOptions;
use std::ffi::OsString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Patents,
    Trials,
    Market,
    Web,
}

impl Source {
    pub fn parse(input: &str) -> Result<Self> {
        match input {
            "patents" => Ok(Self::Patents),
            "trials" => Ok(Self::Trials),
            "market" => Ok(Self::Market),
            "web" => Ok(Self::Web),
            _ => anyhow::bail!("invalid source: {input} (expected patents|trials|market|web)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub query: String,
    pub poll: bool,
    pub demo: bool,
    pub api: Option<String>,
    pub write_config: bool,
    pub sources: Vec<Source>,
}

impl CliArgs {
    pub fn options(&self) -> AnalysisOptions {
        if self.sources.is_empty() {
            return AnalysisOptions::default();
        }
        AnalysisOptions {
            include_patents: self.sources.contains(&Source::Patents),
            include_clinical_trials: self.sources.contains(&Source::Trials),
            include_market_data: self.sources.contains(&Source::Market),
            include_web_intel: self.sources.contains(&Source::Web),
        }
    }
}

pub fn parse_args() -> Result<CliArgs> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = OsString>,
{
    let mut query: Option<String> = None;
    let mut poll = false;
    let mut demo = false;
    let mut api = None;
    let mut write_config = false;
    let mut sources = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--poll" {
            poll = true;
        } else if arg == "--demo" {
            demo = true;
        } else if arg == "--write-config" {
            write_config = true;
        } else if arg == "--api" {
            let Some(url) = args.next() else {
                anyhow::bail!("--api expects a base url");
            };
            api = Some(url.to_string_lossy().into_owned());
        } else if arg == "--include" {
            let Some(value) = args.next() else {
                anyhow::bail!("--include expects patents|trials|market|web");
            };
            let source = Source::parse(&value.to_string_lossy())?;
            if !sources.contains(&source) {
                sources.push(source);
            }
        } else if arg.to_string_lossy().starts_with("--") {
            anyhow::bail!("unknown argument: {:?}", arg);
        } else if query.is_some() {
            anyhow::bail!("unexpected extra argument: {:?}", arg);
        } else {
            query = Some(arg.to_string_lossy().into_owned());
        }
    }

    let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
        anyhow::bail!("usage: pipegraph-viewer <query> [--poll] [--demo] [--api <url>] [--write-config] [--include <source>]...");
    };

    Ok(CliArgs {
        query,
        poll,
        demo,
        api,
        write_config,
        sources,
    })
}
