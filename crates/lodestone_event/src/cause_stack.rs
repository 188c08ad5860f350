//! # Cause stack
//!
//! The [`CauseStackManager`] tracks, for one execution flow, the objects that
//! are currently "causing" things to happen. Code pushes itself as a cause
//! before triggering an action and pops afterwards; events fired in between
//! pick up [`current_cause`](CauseStackManager::current_cause) automatically.
//!
//! ## Frames
//!
//! A frame records the state of the cause stack and the context when it is
//! pushed. Popping the frame restores both, including causes that were popped
//! from *below* the frame while it was open. Frames nest strictly: only the
//! innermost open frame may be popped.
//!
//! [`create_cause_frame`](CauseStackManager::create_cause_frame) returns a
//! [`StackFrame`] guard that pops its frame when dropped, so every exit path
//! (including `?` and unwinding) restores the stack.
//!
//! ## Ownership
//!
//! A manager belongs to a single execution flow and is passed around as
//! `&mut`. It is not shared between flows.

use crate::cause::{downcast_ref, Cause, CauseBuilder, CauseObject, SharedCause};
use crate::context::{EventContext, EventContextKey};
use crate::error::{CauseStackError, ContextError};
use lodestone_data::ResourceKey;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Identifies an open cause frame.
///
/// Handles are not `Clone`: each one pops exactly one frame.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameHandle {
    id: u64,
}

impl FrameHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
struct Frame {
    id: u64,
    /// Stack length owned by enclosing scopes.
    boundary: usize,
    /// Causes popped from below the boundary, most recently popped last.
    stashed: Vec<SharedCause>,
    context: BTreeMap<ResourceKey, SharedCause>,
}

/// Per-flow stack of causes, frames and context entries.
///
/// # Examples
///
/// ```rust
/// use lodestone_event::{downcast_ref, CauseStackManager};
///
/// let mut stack = CauseStackManager::new();
/// stack.push_cause("server");
/// {
///     let mut frame = stack.create_cause_frame().unwrap();
///     frame.push_cause("command");
///     let cause = frame.current_cause().unwrap();
///     assert_eq!(downcast_ref::<&str>(cause.root()), Some(&"command"));
/// }
/// assert_eq!(stack.stack_len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct CauseStackManager {
    causes: Vec<SharedCause>,
    frames: Vec<Frame>,
    context: BTreeMap<ResourceKey, SharedCause>,
    next_frame_id: u64,
    max_frame_depth: usize,
    cached_cause: Option<Cause>,
    cached_context: Option<EventContext>,
}

impl CauseStackManager {
    /// Creates a manager without a frame depth limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager refusing to open more than `max_frame_depth` nested
    /// frames. `0` means unbounded.
    pub fn with_max_frame_depth(max_frame_depth: usize) -> Self {
        Self {
            max_frame_depth,
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------------
    // Causes
    // ------------------------------------------------------------------------

    /// The current cause, most recently pushed object first.
    ///
    /// # Returns
    ///
    /// `Err(CauseStackError::EmptyStack)` when no cause is on the stack.
    pub fn current_cause(&mut self) -> Result<Cause, CauseStackError> {
        if let Some(cause) = &self.cached_cause {
            return Ok(cause.clone());
        }
        if self.causes.is_empty() {
            return Err(CauseStackError::EmptyStack);
        }
        let context = self.current_context();
        let cause = CauseBuilder::default()
            .append_all(self.causes.iter().rev().cloned())
            .build(context)?;
        self.cached_cause = Some(cause.clone());
        Ok(cause)
    }

    /// Pushes `object` as the most immediate cause.
    pub fn push_cause<T: CauseObject>(&mut self, object: T) -> &mut Self {
        self.push_shared_cause(Arc::new(object))
    }

    pub fn push_shared_cause(&mut self, object: SharedCause) -> &mut Self {
        self.causes.push(object);
        self.cached_cause = None;
        self
    }

    /// Pops the most immediate cause.
    ///
    /// Popping below the innermost frame is allowed; the popped cause comes
    /// back when that frame is popped.
    pub fn pop_cause(&mut self) -> Result<SharedCause, CauseStackError> {
        let object = self.causes.pop().ok_or(CauseStackError::EmptyStack)?;
        if let Some(frame) = self.frames.last_mut() {
            if self.causes.len() < frame.boundary {
                frame.boundary = self.causes.len();
                frame.stashed.push(Arc::clone(&object));
            }
        }
        self.cached_cause = None;
        Ok(object)
    }

    /// Pops `n` causes. Nothing is popped when fewer than `n` are on the stack.
    pub fn pop_causes(&mut self, n: usize) -> Result<(), CauseStackError> {
        if n > self.causes.len() {
            return Err(CauseStackError::EmptyStack);
        }
        for _ in 0..n {
            self.pop_cause()?;
        }
        Ok(())
    }

    /// The most immediate cause, without popping it.
    pub fn peek_cause(&self) -> Result<SharedCause, CauseStackError> {
        self.causes.last().cloned().ok_or(CauseStackError::EmptyStack)
    }

    /// Number of causes on the stack.
    pub fn stack_len(&self) -> usize {
        self.causes.len()
    }

    // ------------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------------

    /// Opens a frame.
    ///
    /// # Returns
    ///
    /// `Err(CauseStackError::DepthExceeded)` when the configured depth limit
    /// is reached.
    pub fn push_cause_frame(&mut self) -> Result<FrameHandle, CauseStackError> {
        if self.max_frame_depth > 0 && self.frames.len() >= self.max_frame_depth {
            error!("❌ Cause frame depth limit of {} reached", self.max_frame_depth);
            return Err(CauseStackError::DepthExceeded {
                limit: self.max_frame_depth,
            });
        }
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        self.frames.push(Frame {
            id,
            boundary: self.causes.len(),
            stashed: Vec::new(),
            context: self.context.clone(),
        });
        debug!("🧱 Pushed cause frame {} (depth {})", id, self.frames.len());
        Ok(FrameHandle { id })
    }

    /// Closes the innermost frame, restoring causes and context.
    ///
    /// # Returns
    ///
    /// `Err(CauseStackError::FrameOrderViolation)` when `handle` is not the
    /// innermost frame, in which case nothing changes.
    pub fn pop_cause_frame(&mut self, handle: &FrameHandle) -> Result<(), CauseStackError> {
        let top = self.frames.last().ok_or(CauseStackError::NoFrame)?;
        if top.id != handle.id {
            return Err(CauseStackError::FrameOrderViolation {
                expected: top.id,
                actual: handle.id,
            });
        }
        let frame = self.frames.pop().ok_or(CauseStackError::NoFrame)?;
        self.causes.truncate(frame.boundary);
        self.causes.extend(frame.stashed.into_iter().rev());
        self.context = frame.context;
        self.cached_cause = None;
        self.cached_context = None;
        debug!("🧱 Popped cause frame {} (depth {})", frame.id, self.frames.len());
        Ok(())
    }

    /// Opens a frame that closes itself when the returned guard is dropped.
    pub fn create_cause_frame(&mut self) -> Result<StackFrame<'_>, CauseStackError> {
        let handle = self.push_cause_frame()?;
        Ok(StackFrame {
            manager: self,
            handle: Some(handle),
        })
    }

    /// Number of open frames.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn max_frame_depth(&self) -> usize {
        self.max_frame_depth
    }

    // ------------------------------------------------------------------------
    // Context
    // ------------------------------------------------------------------------

    /// Snapshot of the current context.
    pub fn current_context(&mut self) -> EventContext {
        if let Some(context) = &self.cached_context {
            return context.clone();
        }
        let context = EventContext::from_entries(self.context.clone());
        self.cached_context = Some(context.clone());
        context
    }

    /// Sets a context entry, replacing any existing entry for `key`.
    pub fn add_context<T: CauseObject>(&mut self, key: &EventContextKey<T>, value: T) -> &mut Self {
        self.context.insert(key.id().clone(), Arc::new(value));
        self.invalidate_context();
        self
    }

    /// Typed context entry for `key`.
    pub fn context<T: CauseObject>(&self, key: &EventContextKey<T>) -> Option<&T> {
        self.context.get(key.id()).and_then(downcast_ref::<T>)
    }

    /// Typed context entry for `key`, or `ContextError::MissingKey`.
    pub fn require_context<T: CauseObject>(&self, key: &EventContextKey<T>) -> Result<&T, CauseStackError> {
        self.context(key)
            .ok_or_else(|| ContextError::MissingKey(key.id().clone()).into())
    }

    /// Removes and returns the context entry for `key`.
    pub fn remove_context<T: CauseObject>(&mut self, key: &EventContextKey<T>) -> Option<Arc<T>> {
        let removed = self.context.remove(key.id())?;
        self.invalidate_context();
        removed.into_any_arc().downcast::<T>().ok()
    }

    fn invalidate_context(&mut self) {
        self.cached_context = None;
        self.cached_cause = None;
    }
}

// ============================================================================
// Frame guard
// ============================================================================

/// Scope guard for a cause frame.
///
/// The frame is popped when the guard is dropped or [`close`](Self::close)d.
#[derive(Debug)]
pub struct StackFrame<'a> {
    manager: &'a mut CauseStackManager,
    handle: Option<FrameHandle>,
}

impl<'a> StackFrame<'a> {
    pub fn current_cause(&mut self) -> Result<Cause, CauseStackError> {
        self.manager.current_cause()
    }

    pub fn current_context(&mut self) -> EventContext {
        self.manager.current_context()
    }

    pub fn push_cause<T: CauseObject>(&mut self, object: T) -> &mut Self {
        self.manager.push_cause(object);
        self
    }

    pub fn pop_cause(&mut self) -> Result<SharedCause, CauseStackError> {
        self.manager.pop_cause()
    }

    pub fn add_context<T: CauseObject>(&mut self, key: &EventContextKey<T>, value: T) -> &mut Self {
        self.manager.add_context(key, value);
        self
    }

    pub fn remove_context<T: CauseObject>(&mut self, key: &EventContextKey<T>) -> Option<Arc<T>> {
        self.manager.remove_context(key)
    }

    /// Opens a nested frame.
    pub fn create_cause_frame(&mut self) -> Result<StackFrame<'_>, CauseStackError> {
        self.manager.create_cause_frame()
    }

    /// The underlying manager.
    pub fn manager(&mut self) -> &mut CauseStackManager {
        self.manager
    }

    /// Pops the frame now.
    pub fn close(mut self) -> Result<(), CauseStackError> {
        match self.handle.take() {
            Some(handle) => self.manager.pop_cause_frame(&handle),
            None => Ok(()),
        }
    }
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.manager.pop_cause_frame(&handle) {
                error!("❌ Failed to close cause frame {}: {}", handle.id(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::event_context_keys;

    fn text(object: &SharedCause) -> Option<&'static str> {
        downcast_ref::<&'static str>(object).copied()
    }

    fn texts(stack: &mut CauseStackManager) -> Vec<&'static str> {
        match stack.current_cause() {
            Ok(cause) => cause.iter().filter_map(text).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_current_cause_is_most_recent_first() {
        let mut stack = CauseStackManager::new();
        assert_eq!(stack.current_cause().unwrap_err(), CauseStackError::EmptyStack);

        stack.push_cause("world").push_cause("player");
        assert_eq!(texts(&mut stack), vec!["player", "world"]);
        assert_eq!(stack.peek_cause().ok().as_ref().and_then(text), Some("player"));

        assert_eq!(stack.pop_cause().ok().as_ref().and_then(text), Some("player"));
        assert_eq!(texts(&mut stack), vec!["world"]);
    }

    #[test]
    fn test_pop_causes_is_all_or_nothing() {
        let mut stack = CauseStackManager::new();
        stack.push_cause("a").push_cause("b");
        assert_eq!(stack.pop_causes(3).unwrap_err(), CauseStackError::EmptyStack);
        assert_eq!(stack.stack_len(), 2);
        stack.pop_causes(2).unwrap();
        assert_eq!(stack.stack_len(), 0);
        assert!(stack.pop_cause().is_err());
    }

    #[test]
    fn test_frame_restores_causes_and_context() {
        let mut stack = CauseStackManager::new();
        stack.push_cause("server").push_cause("plugin");
        stack.add_context(&event_context_keys::COMMAND, "reload".to_string());

        let frame = stack.push_cause_frame().unwrap();
        stack.pop_cause().unwrap();
        stack.pop_cause().unwrap();
        stack.push_cause("scheduler");
        stack.add_context(&event_context_keys::COMMAND, "stop".to_string());
        stack.remove_context(&event_context_keys::COMMAND);
        assert_eq!(texts(&mut stack), vec!["scheduler"]);

        stack.pop_cause_frame(&frame).unwrap();
        assert_eq!(texts(&mut stack), vec!["plugin", "server"]);
        assert_eq!(
            stack.context(&event_context_keys::COMMAND).map(String::as_str),
            Some("reload")
        );
        assert_eq!(stack.frame_depth(), 0);
    }

    #[test]
    fn test_out_of_order_pop_leaves_state_untouched() {
        let mut stack = CauseStackManager::new();
        let outer = stack.push_cause_frame().unwrap();
        stack.push_cause("outer");
        let inner = stack.push_cause_frame().unwrap();
        stack.push_cause("inner");

        let err = stack.pop_cause_frame(&outer).unwrap_err();
        assert_eq!(
            err,
            CauseStackError::FrameOrderViolation {
                expected: inner.id(),
                actual: outer.id(),
            }
        );
        assert_eq!(stack.frame_depth(), 2);
        assert_eq!(texts(&mut stack), vec!["inner", "outer"]);

        stack.pop_cause_frame(&inner).unwrap();
        stack.pop_cause_frame(&outer).unwrap();
        assert_eq!(stack.stack_len(), 0);
        assert_eq!(stack.pop_cause_frame(&outer).unwrap_err(), CauseStackError::NoFrame);
    }

    #[test]
    fn test_depth_limit() {
        let mut stack = CauseStackManager::with_max_frame_depth(2);
        let a = stack.push_cause_frame().unwrap();
        let b = stack.push_cause_frame().unwrap();
        assert_eq!(
            stack.push_cause_frame().unwrap_err(),
            CauseStackError::DepthExceeded { limit: 2 }
        );
        stack.pop_cause_frame(&b).unwrap();
        stack.pop_cause_frame(&a).unwrap();
    }

    #[test]
    fn test_guard_pops_on_early_return() {
        fn run(stack: &mut CauseStackManager) -> Result<(), CauseStackError> {
            let mut frame = stack.create_cause_frame()?;
            frame.push_cause("task");
            frame.add_context(&event_context_keys::COMMAND, "fail".to_string());
            frame.manager().require_context(&event_context_keys::PLAYER)?;
            Ok(())
        }

        let mut stack = CauseStackManager::new();
        stack.push_cause("root");
        assert!(run(&mut stack).is_err());
        assert_eq!(stack.frame_depth(), 0);
        assert_eq!(texts(&mut stack), vec!["root"]);
        assert!(stack.context(&event_context_keys::COMMAND).is_none());
    }

    #[test]
    fn test_guard_pops_on_unwind() {
        let mut stack = CauseStackManager::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut frame = stack.create_cause_frame().unwrap();
            frame.push_cause("doomed");
            panic!("listener blew up");
        }));
        assert!(result.is_err());
        assert_eq!(stack.frame_depth(), 0);
        assert_eq!(stack.stack_len(), 0);
    }

    #[test]
    fn test_nested_guards_and_close() {
        let mut stack = CauseStackManager::new();
        let mut outer = stack.create_cause_frame().unwrap();
        outer.push_cause("outer");
        {
            let mut inner = outer.create_cause_frame().unwrap();
            inner.push_cause("inner");
            assert_eq!(inner.manager().frame_depth(), 2);
            inner.close().unwrap();
        }
        assert_eq!(outer.manager().stack_len(), 1);
        outer.close().unwrap();
        assert_eq!(stack.frame_depth(), 0);
        assert_eq!(stack.stack_len(), 0);
    }

    #[test]
    fn test_cause_is_cached_until_change() {
        let mut stack = CauseStackManager::new();
        stack.push_cause("a");
        let first = stack.current_cause().unwrap();
        let second = stack.current_cause().unwrap();
        assert_eq!(first, second);

        stack.add_context(&event_context_keys::COMMAND, "x".to_string());
        let third = stack.current_cause().unwrap();
        assert!(third.context().contains_key(&event_context_keys::COMMAND));
        assert!(!first.context().contains_key(&event_context_keys::COMMAND));
    }

    #[test]
    fn test_remove_context_returns_typed_value() {
        let mut stack = CauseStackManager::new();
        stack.add_context(&event_context_keys::COMMAND, "ban".to_string());
        let removed = stack.remove_context(&event_context_keys::COMMAND).unwrap();
        assert_eq!(removed.as_str(), "ban");
        assert!(stack.remove_context(&event_context_keys::COMMAND).is_none());
        assert!(matches!(
            stack.require_context(&event_context_keys::COMMAND),
            Err(CauseStackError::Context(ContextError::MissingKey(_)))
        ));
    }
}
