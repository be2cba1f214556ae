#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    sessions_created: u32,
    tasks_finished: u32,
    tasks_interrupted: u32,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self {
            sessions_created: 0,
            tasks_finished: 0,
            tasks_interrupted: 0,
        }
    }

    pub(crate) fn record_session_created(&mut self) {
        self.sessions_created += 1;
    }

    pub(crate) fn record_task_finished(&mut self) {
        self.tasks_finished += 1;
    }

    pub(crate) fn record_task_interrupted(&mut self) {
        self.tasks_interrupted += 1;
    }

    pub fn sessions_created(&self) -> u32 {
        self.sessions_created
    }

    pub fn tasks_finished(&self) -> u32 {
        self.tasks_finished
    }

    pub fn tasks_interrupted(&self) -> u32 {
        self.tasks_interrupted
    }
}
