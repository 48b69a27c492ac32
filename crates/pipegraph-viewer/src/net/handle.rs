use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct ReaderHandle {
    task: JoinHandle<()>,
}

impl ReaderHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
