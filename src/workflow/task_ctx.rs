//! 任务处理上下文
//!
//! 封装"我正在处理第几批的第几个任务"这一信息，只用于日志

use std::fmt::Display;

use crate::models::TaskId;

#[derive(Debug, Clone)]
pub struct TaskCtx {
    pub task_id: TaskId,
    /// 批次编号（从1开始）
    pub batch_num: u64,
    /// 任务在本批中的位置（从1开始）
    pub position: usize,
    /// 本批任务总数
    pub batch_size: usize,
}

impl TaskCtx {
    pub fn new(task_id: TaskId, batch_num: u64, position: usize, batch_size: usize) -> Self {
        Self {
            task_id,
            batch_num,
            position,
            batch_size,
        }
    }
}

impl Display for TaskCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[任务 #{} 批次#{} {}/{}]",
            self.task_id, self.batch_num, self.position, self.batch_size
        )
    }
}
