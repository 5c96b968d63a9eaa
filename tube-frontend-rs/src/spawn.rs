use futures::{
    future::LocalFutureObj,
    task::{LocalSpawn, SpawnError},
};

/// Spawns engagement requests on the current thread's executor.
///
/// On wasm32 that's the browser's microtask queue. Natively it's tokio's `spawn_local`, so
/// callers must be running inside a [`tokio::task::LocalSet`]; outside of one, spawning panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeSpawner;

impl LocalSpawn for RuntimeSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(future);

        #[cfg(not(target_arch = "wasm32"))]
        {
            if tokio::runtime::Handle::try_current().is_err() {
                return Err(SpawnError::shutdown());
            }
            drop(tokio::task::spawn_local(future));
        }

        Ok(())
    }
}
