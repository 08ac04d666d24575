//! Generic functions: a callable face for a dispatch table.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::DispatchConfig;
use crate::dispatch::{DispatchKey, DispatchTable};
use crate::error::DispatchResult;
use crate::hierarchy::{TypeHierarchy, TypeId, TypeSystem};

/// A shareable handler taking the dispatch argument.
pub type Handler<A, R> = Arc<dyn Fn(&A) -> R + Send + Sync>;

/// Values that know their runtime type.
pub trait Instance {
    /// The concrete type of this value.
    fn type_of(&self) -> TypeId;
}

/// A function whose behaviour depends on the runtime type of its argument.
///
/// The underlying table is guarded by a mutex, so a generic function can be
/// shared between threads. The lock is released before a handler runs, which
/// lets handlers call back into the same function.
pub struct GenericFunction<A: ?Sized, R, S: TypeSystem + ?Sized = TypeHierarchy> {
    name: String,
    table: Mutex<DispatchTable<Handler<A, R>, S>>,
}

impl<A: ?Sized, R, S: TypeSystem + ?Sized> GenericFunction<A, R, S> {
    /// Creates a generic function with `default` as its fallback.
    pub fn new<H>(name: impl Into<String>, types: Arc<S>, default: H) -> Self
    where
        H: Fn(&A) -> R + Send + Sync + 'static,
    {
        Self::with_config(name, types, default, &DispatchConfig::default())
    }

    /// Creates a generic function with explicit configuration.
    pub fn with_config<H>(name: impl Into<String>, types: Arc<S>, default: H, config: &DispatchConfig) -> Self
    where
        H: Fn(&A) -> R + Send + Sync + 'static,
    {
        let default: Handler<A, R> = Arc::new(default);
        Self {
            name: name.into(),
            table: Mutex::new(DispatchTable::with_config(types, default, config)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers `handler` for `key` and hands it back.
    pub fn register<H>(&self, key: impl Into<DispatchKey>, handler: H) -> DispatchResult<Handler<A, R>>
    where
        H: Fn(&A) -> R + Send + Sync + 'static,
    {
        let handler: Handler<A, R> = Arc::new(handler);
        self.table.lock().register(key, handler).cloned()
    }

    /// Registers `handler` for the types named by `annotation`.
    pub fn register_annotated<H>(&self, annotation: &str, handler: H) -> DispatchResult<Handler<A, R>>
    where
        H: Fn(&A) -> R + Send + Sync + 'static,
    {
        let handler: Handler<A, R> = Arc::new(handler);
        self.table.lock().register_annotated(annotation, handler).cloned()
    }

    /// The handler that values of type `ty` dispatch to.
    pub fn dispatch(&self, ty: TypeId) -> DispatchResult<Handler<A, R>> {
        self.table.lock().resolve(ty).cloned()
    }

    /// Dispatches on the runtime type of `arg` and runs the handler.
    pub fn call(&self, arg: &A) -> DispatchResult<R>
    where
        A: Instance,
    {
        let handler = self.dispatch(arg.type_of())?;
        Ok(handler(arg))
    }

    /// Drops every cached resolution.
    pub fn clear_cache(&self) {
        self.table.lock().clear_cache();
    }

    /// Snapshot of the current bindings.
    pub fn bindings(&self) -> Vec<(TypeId, Handler<A, R>)> {
        self.table
            .lock()
            .registry()
            .iter()
            .map(|(ty, handler)| (ty, Arc::clone(handler)))
            .collect()
    }

    pub fn cache_len(&self) -> usize {
        self.table.lock().cache_len()
    }
}

impl<A: ?Sized, R, S: TypeSystem + ?Sized> fmt::Debug for GenericFunction<A, R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericFunction")
            .field("name", &self.name)
            .field("table", &*self.table.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Collections;
    use crate::error::DispatchError;

    struct Value {
        ty: TypeId,
        len: usize,
    }

    impl Instance for Value {
        fn type_of(&self) -> TypeId {
            self.ty
        }
    }

    fn describe(types: Arc<TypeHierarchy>) -> GenericFunction<Value, String> {
        GenericFunction::new("describe", types, |_: &Value| "base".to_string())
    }

    #[test]
    fn test_call_dispatches_on_argument_type() {
        let types = Arc::new(TypeHierarchy::new());
        let c = Collections::install(&types).unwrap();
        let g = describe(Arc::clone(&types));
        g.register(c.sized, |v: &Value| format!("sized {}", v.len)).unwrap();
        g.register(c.int, |_: &Value| "integer".to_string()).unwrap();

        assert_eq!(g.call(&Value { ty: c.list, len: 3 }).unwrap(), "sized 3");
        assert_eq!(g.call(&Value { ty: c.bool, len: 0 }).unwrap(), "integer");
        assert_eq!(g.call(&Value { ty: TypeId::ROOT, len: 0 }).unwrap(), "base");
    }

    #[test]
    fn test_register_returns_handler() {
        let types = Arc::new(TypeHierarchy::new());
        let c = Collections::install(&types).unwrap();
        let g = describe(Arc::clone(&types));
        let h = g.register_annotated("int | str", |_: &Value| "scalar".to_string()).unwrap();

        assert!(Arc::ptr_eq(&h, &g.dispatch(c.int).unwrap()));
        assert!(Arc::ptr_eq(&h, &g.dispatch(c.str).unwrap()));
        assert!(Arc::ptr_eq(&g.dispatch(TypeId::ROOT).unwrap(), &g.dispatch(c.dict).unwrap()));
        assert_eq!(g.bindings().len(), 3);
    }

    #[test]
    fn test_call_reports_ambiguity() {
        let types = Arc::new(TypeHierarchy::new());
        let iterable = types.category("Iterable", &[]).unwrap();
        let container = types.category("Container", &[]).unwrap();
        let p = types.concrete("P", &[]).unwrap();
        let g = describe(Arc::clone(&types));
        g.register(iterable, |_: &Value| "iterable".to_string()).unwrap();
        g.register(container, |_: &Value| "container".to_string()).unwrap();
        types.register_virtual(iterable, p).unwrap();
        types.register_virtual(container, p).unwrap();

        let err = g.call(&Value { ty: p, len: 0 }).unwrap_err();
        assert!(matches!(err, DispatchError::Ambiguous { .. }));
    }

    #[test]
    fn test_shared_between_threads() {
        let types = Arc::new(TypeHierarchy::new());
        let c = Collections::install(&types).unwrap();
        let g = describe(Arc::clone(&types));
        g.register(c.mapping, |_: &Value| "mapping".to_string()).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        assert_eq!(g.call(&Value { ty: c.dict, len: 0 }).unwrap(), "mapping");
                        assert_eq!(g.call(&Value { ty: c.list, len: 0 }).unwrap(), "base");
                    }
                });
            }
        });
        assert_eq!(g.name(), "describe");
    }
}
