use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use futures_channel::oneshot;
use slotmap::{new_key_type, SlotMap};

use crate::{
    client::Fetcher, Operation, QueryState, RequestPolicy,
};

new_key_type! {
    /// Identifies a listener registered on a query handle.
    pub struct ListenerId;
}

/// Canonical state holder for one mounted query.
///
/// Owns the lifecycle state, the in-flight request slot, and the listener
/// registry. Handles clone it freely; all clones observe the same state.
#[derive(Clone)]
pub(crate) struct Query<K, D> {
    operation: Rc<Operation<K>>,

    fetcher: Fetcher<K, D>,

    paused: Rc<Cell<bool>>,

    // Cancellation
    current_request: Rc<Cell<Option<oneshot::Sender<()>>>>,

    // State
    state: Rc<Cell<QueryState<D>>>,

    // Synchronization
    listeners: Rc<RefCell<SlotMap<ListenerId, Box<dyn Fn(&QueryState<D>)>>>>,
}

impl<K, D> Query<K, D>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
{
    pub(crate) fn new(operation: Operation<K>, fetcher: Fetcher<K, D>, paused: bool) -> Self {
        Query {
            operation: Rc::new(operation),
            fetcher,
            paused: Rc::new(Cell::new(paused)),
            current_request: Rc::new(Cell::new(None)),
            state: Rc::new(Cell::new(QueryState::Created)),
            listeners: Rc::new(RefCell::new(SlotMap::with_key())),
        }
    }

    pub(crate) fn set_state(&self, state: QueryState<D>) {
        self.state.set(state.clone());

        // Notify listeners after the new state is observable through reads.
        let listeners = self.listeners.try_borrow().expect("set_state borrow");
        for listener in listeners.values() {
            listener(&state);
        }
    }

    /// If update returns Ok(_) the state will be updated and listeners will be notified.
    /// If update returns Err(_) the state will not be updated and listeners will not be notified.
    /// Err(_) should always contain the previous state.
    pub(crate) fn maybe_map_state(
        &self,
        update_fn: impl FnOnce(QueryState<D>) -> Result<QueryState<D>, QueryState<D>>,
    ) -> bool {
        let current_state = self.state.take();

        match update_fn(current_state) {
            Ok(new_state) => {
                self.set_state(new_state);
                true
            }
            Err(old_state) => {
                self.state.set(old_state);
                false
            }
        }
    }

    pub(crate) fn get_state(&self) -> QueryState<D> {
        let state = self.state.take();
        let state_clone = state.clone();
        self.state.set(state);
        state_clone
    }

    // Useful to avoid clones.
    pub(crate) fn with_state<T>(&self, func: impl FnOnce(&QueryState<D>) -> T) -> T {
        let state = self.state.take();
        let result = func(&state);
        self.state.set(state);
        result
    }

    pub(crate) fn add_listener(&self, listener: impl Fn(&QueryState<D>) + 'static) -> ListenerId {
        self.listeners
            .try_borrow_mut()
            .expect("add_listener borrow_mut")
            .insert(Box::new(listener))
    }

    pub(crate) fn remove_listener(&self, key: ListenerId) -> bool {
        self.listeners
            .try_borrow_mut()
            .expect("remove_listener borrow_mut")
            .remove(key)
            .is_some()
    }

    pub(crate) fn fetcher(&self) -> Fetcher<K, D> {
        self.fetcher.clone()
    }

    pub(crate) fn operation(&self, policy_override: Option<RequestPolicy>) -> Operation<K> {
        match policy_override {
            Some(policy) => self.operation.with_policy(policy),
            None => (*self.operation).clone(),
        }
    }
}

/**
 * Execution and Cancellation.
 *
 * Kept free of trait bounds; Drop impls call into these.
 */
impl<K, D> Query<K, D> {
    pub(crate) fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.set(paused);
    }

    pub(crate) fn paused_flag(&self) -> Rc<Cell<bool>> {
        self.paused.clone()
    }

    // Only scenario where two requests can exist at the same time is the first is cancelled.
    pub(crate) fn new_execution(&self) -> Option<oneshot::Receiver<()>> {
        let current_request = self.current_request.take();
        if current_request.is_none() {
            let (sender, receiver) = oneshot::channel();
            self.current_request.set(Some(sender));
            Some(receiver)
        } else {
            self.current_request.set(current_request);
            None
        }
    }

    pub(crate) fn finalize_execution(&self) {
        self.current_request.set(None);
    }

    pub(crate) fn cancel(&self) -> bool {
        if let Some(current_request) = self.current_request.take() {
            let cancellation = current_request.send(());
            if cancellation.is_err() {
                log::warn!("failed to cancel in-flight request");
            }
            cancellation.is_ok()
        } else {
            false
        }
    }
}
