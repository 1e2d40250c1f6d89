//! Bounded operand stack.

use core::fmt;

use lumen_core::Value;

/// Default operand stack depth.
pub const STACK_MAX: usize = 256;

/// LIFO storage with a hard upper bound of `LIMIT` values.
pub struct Stack<const LIMIT: usize = STACK_MAX> {
    values: Vec<Value>,
}

impl<const LIMIT: usize> Default for Stack<LIMIT> {
    fn default() -> Self { Self::new() }
}

impl<const LIMIT: usize> Stack<LIMIT> {
    /// Empty stack; storage is allocated on first push.
    pub const fn new() -> Self { Self { values: Vec::new() } }

    /// Maximum depth.
    pub const fn limit(&self) -> usize { LIMIT }

    /// Push, or give the value back when the stack is full.
    pub fn push(&mut self, value: Value) -> Result<(), Value> {
        if self.values.len() == LIMIT {
            return Err(value);
        }
        if self.values.capacity() == 0 {
            self.values.reserve_exact(LIMIT);
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop the top value.
    pub fn pop(&mut self) -> Option<Value> { self.values.pop() }

    /// Top value without removing it.
    pub fn peek(&self) -> Option<Value> { self.values.last().copied() }

    /// Current depth.
    pub fn len(&self) -> usize { self.values.len() }

    /// Whether the stack holds nothing.
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Drop every value, keep the storage.
    pub fn reset(&mut self) { self.values.clear(); }

    /// Drop every value and the storage.
    pub fn free(&mut self) { self.values = Vec::new(); }

    /// Bottom-to-top view.
    pub fn as_slice(&self) -> &[Value] { &self.values }
}

impl<const LIMIT: usize> fmt::Debug for Stack<LIMIT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for v in &self.values {
            list.entry(v);
        }
        list.finish()
    }
}
