// src/auction/combination.rs

use std::collections::VecDeque;

/// 时长序列的来源（外部组合生成器）。
///
/// 每次调用返回一个候选的时长序列，耗尽后返回空序列。
/// 实现不要求线程安全，调用方负责串行化。
pub trait CombinationSource: Send {
    fn get(&mut self) -> Vec<i64>;
}

/// 预先给定的时长序列列表，按顺序逐个返回
#[derive(Debug, Clone, Default)]
pub struct SequenceList {
    sequences: VecDeque<Vec<i64>>,
}

impl SequenceList {
    pub fn new(sequences: Vec<Vec<i64>>) -> Self {
        Self {
            sequences: sequences.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.sequences.len()
    }
}

impl CombinationSource for SequenceList {
    fn get(&mut self) -> Vec<i64> {
        self.sequences.pop_front().unwrap_or_default()
    }
}

impl<F> CombinationSource for F
where
    F: FnMut() -> Vec<i64> + Send,
{
    fn get(&mut self) -> Vec<i64> {
        self()
    }
}
