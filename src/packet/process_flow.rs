use crate::level::Level;

/// Kind of process-flow transition being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ProcessFlowType {
    EnterMethod = 0,
    LeaveMethod = 1,
    EnterThread = 2,
    LeaveThread = 3,
    EnterProcess = 4,
    LeaveProcess = 5,
}

impl ProcessFlowType {
    #[must_use]
    pub fn is_enter_method(self) -> bool {
        matches!(self, Self::EnterMethod)
    }

    #[must_use]
    pub fn is_leave_method(self) -> bool {
        matches!(self, Self::LeaveMethod)
    }
}

/// Marks method/thread/process enter and leave transitions for the
/// Console's call-stack view.
#[derive(Debug, Clone)]
pub struct ProcessFlow {
    pub level: Level,
    pub process_flow_type: ProcessFlowType,
    pub title: Option<String>,
    pub host_name: Option<String>,
    pub process_id: i32,
    pub thread_id: i32,
    pub timestamp: i64,
}

impl ProcessFlow {
    #[must_use]
    pub fn new(process_flow_type: ProcessFlowType, title: impl Into<String>) -> Self {
        Self {
            level: Level::Debug,
            process_flow_type,
            title: Some(title.into()),
            host_name: None,
            process_id: 0,
            thread_id: 0,
            timestamp: 0,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        const HEADER: usize = 4 // process_flow_type
            + 4 // len title
            + 4 // len host
            + 4 // process_id
            + 4 // thread_id
            + 8; // timestamp
        HEADER
            + self.title.as_deref().map_or(0, str::len)
            + self.host_name.as_deref().map_or(0, str::len)
    }
}
