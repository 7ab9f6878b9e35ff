// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// 页面任务：某个区间结果集中的页码（从1开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageTask {
    pub page: u32,
}

/// 页码队列
///
/// 单个区间的所有工作者共享的先进先出队列。出队在锁内完成，
/// 两个工作者不会拿到同一个页码。锁不会跨越任何挂起点持有。
#[derive(Debug, Default)]
pub struct PageQueue {
    tasks: Mutex<VecDeque<PageTask>>,
}

impl PageQueue {
    /// 创建包含 `1..=total_pages` 的队列
    pub fn with_pages(total_pages: u32) -> Self {
        Self {
            tasks: Mutex::new((1..=total_pages).map(|page| PageTask { page }).collect()),
        }
    }

    /// 出队
    ///
    /// # 返回值
    ///
    /// * `Some(PageTask)` - 下一个页码
    /// * `None` - 队列已耗尽，工作者应正常退出
    pub fn dequeue(&self) -> Option<PageTask> {
        self.tasks.lock().pop_front()
    }

    /// 取出所有剩余任务
    pub fn drain(&self) -> Vec<PageTask> {
        self.tasks.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}
