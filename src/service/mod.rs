mod options;
mod request;

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::backend::{BackendRegistry, BenchBackend};
use crate::core::BenchError;
use crate::model::{
    Backend, IndexInfo, IndexSpec, Query, QueryCatalog, QueryType, SingleQueryResult, Workload,
    WorkloadCatalog, WorkloadQuery, WorkloadResult, WorkloadType, execution_count,
};

pub use options::{OptionEntry, OptionKind, options};
pub use request::{CustomRequest, CustomWorkloadRequest, RunSettings, UniqueRequest, WorkloadRequest};

/// Runs benchmark requests across backends, one request at a time.
pub struct BenchmarkService {
    registry: BackendRegistry,
    queries: QueryCatalog,
    workloads: WorkloadCatalog,
    run_lock: Mutex<()>,
}

impl BenchmarkService {
    pub fn new(registry: BackendRegistry, queries: QueryCatalog) -> Self {
        Self {
            registry,
            queries,
            workloads: WorkloadCatalog::predefined(),
            run_lock: Mutex::new(()),
        }
    }

    pub fn queries(&self) -> &QueryCatalog {
        &self.queries
    }

    pub fn workloads(&self) -> &WorkloadCatalog {
        &self.workloads
    }

    /// Runs one catalog query on every selected backend. A backend without a
    /// catalog entry, or one that fails, is left out of the result.
    pub async fn run_single_query(
        &self,
        query_type: QueryType,
        settings: &RunSettings,
    ) -> Result<BTreeMap<Backend, SingleQueryResult>, BenchError> {
        settings.validate()?;
        let _guard = self.run_lock.lock().await;
        info!(
            "==== SINGLE QUERY BENCHMARK ({}) ====",
            query_type.name().to_uppercase()
        );

        let mut results = BTreeMap::new();
        for &backend in &settings.selected_databases {
            let query = match self.queries.lookup(backend, query_type) {
                Ok(query) => query,
                Err(e) => {
                    error!("Skipping {backend}: {e}");
                    continue;
                }
            };
            if let Some(result) = self.single_for_backend(&query, settings).await {
                results.insert(backend, result);
            }
        }
        Ok(results)
    }

    /// Runs caller-supplied query text. A selected backend without text is
    /// skipped.
    pub async fn run_custom_query(
        &self,
        custom_queries: &HashMap<Backend, String>,
        settings: &RunSettings,
    ) -> Result<BTreeMap<Backend, SingleQueryResult>, BenchError> {
        settings.validate()?;
        let _guard = self.run_lock.lock().await;
        info!("==== CUSTOM QUERY BENCHMARK ====");

        let mut results = BTreeMap::new();
        for &backend in &settings.selected_databases {
            let Some(text) = custom_queries.get(&backend).filter(|t| !t.trim().is_empty()) else {
                error!("No custom query provided for {backend}");
                continue;
            };
            let query = Query::custom(backend, text.clone());
            if let Some(result) = self.single_for_backend(&query, settings).await {
                results.insert(backend, result);
            }
        }
        Ok(results)
    }

    /// Runs a predefined workload. An unknown workload fails the request.
    pub async fn run_workload(
        &self,
        kind: WorkloadType,
        settings: &RunSettings,
    ) -> Result<BTreeMap<Backend, WorkloadResult>, BenchError> {
        settings.validate()?;
        let workload = self.workloads.get(kind)?;
        let _guard = self.run_lock.lock().await;
        info!("==== WORKLOAD BENCHMARK ({}) ====", kind.name().to_uppercase());
        Ok(self.workload_for_backends(workload, settings).await)
    }

    /// Runs a caller-defined workload. An empty list is an invalid request.
    pub async fn run_custom_workload(
        &self,
        queries: Vec<WorkloadQuery>,
        settings: &RunSettings,
    ) -> Result<BTreeMap<Backend, WorkloadResult>, BenchError> {
        settings.validate()?;
        let workload = Workload::custom(queries)?;
        let _guard = self.run_lock.lock().await;
        info!("==== CUSTOM WORKLOAD BENCHMARK ====");
        Ok(self.workload_for_backends(&workload, settings).await)
    }

    async fn single_for_backend(
        &self,
        query: &Query,
        settings: &RunSettings,
    ) -> Option<SingleQueryResult> {
        let bench = self.backend(query.backend)?;
        let indexes = settings.indexes_for(query.backend);
        let executions = settings.number_of_executions;
        let scope = query.backend.scope(settings.selected_size);

        let (result, index_info) = execute_for_backend(&bench, scope, indexes, || {
            bench.run(query, executions, scope, indexes)
        })
        .await?;
        Some(SingleQueryResult { result, index_info })
    }

    async fn workload_for_backends(
        &self,
        workload: &Workload,
        settings: &RunSettings,
    ) -> BTreeMap<Backend, WorkloadResult> {
        let mut results = BTreeMap::new();
        for &backend in &settings.selected_databases {
            let Some(bench) = self.backend(backend) else {
                continue;
            };

            // resolve every query before touching the engine
            let plan = match self.workload_plan(backend, workload, settings.number_of_executions) {
                Ok(plan) => plan,
                Err(e) => {
                    error!("Skipping {backend}: {e}");
                    continue;
                }
            };

            let indexes = settings.indexes_for(backend);
            let scope = backend.scope(settings.selected_size);
            let task = || async {
                let mut by_type = BTreeMap::new();
                for (query, executions) in &plan {
                    let result = bench.run(query, *executions, scope, indexes).await?;
                    by_type.insert(query.query_type, result);
                }
                Ok::<_, BenchError>(by_type)
            };

            if let Some((by_type, index_info)) =
                execute_for_backend(&bench, scope, indexes, task).await
            {
                results.insert(
                    backend,
                    WorkloadResult {
                        index_info,
                        results: by_type,
                    },
                );
            }
        }
        results
    }

    /// Queries of the workload with their execution counts, zero counts dropped.
    fn workload_plan(
        &self,
        backend: Backend,
        workload: &Workload,
        executions: u32,
    ) -> Result<Vec<(Query, u32)>, BenchError> {
        let mut plan: Vec<(Query, u32)> = Vec::new();
        for query_type in workload.query_types() {
            let count = execution_count(executions, workload.ratio_for(query_type));
            if count == 0 {
                info!("Skipping {query_type} for {backend}: 0 executions");
                continue;
            }
            if plan.iter().any(|(q, _)| q.query_type == query_type) {
                continue;
            }
            plan.push((self.queries.lookup(backend, query_type)?, count));
        }
        Ok(plan)
    }

    fn backend(&self, backend: Backend) -> Option<Arc<dyn BenchBackend>> {
        let found = self.registry.get(backend);
        if found.is_none() {
            warn!("No backend registered for {backend}");
        }
        found
    }
}

/// Creates the indexes, runs the task and collects index metadata, then drops
/// the indexes whatever the outcome. Failures are logged and yield `None`.
///
/// When the returned future is dropped before completion, the drop is spawned
/// on the runtime instead.
pub async fn execute_for_backend<T, F, Fut>(
    bench: &Arc<dyn BenchBackend>,
    scope: &str,
    indexes: &[IndexSpec],
    task: F,
) -> Option<(T, Vec<IndexInfo>)>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, BenchError>>,
{
    let backend = bench.backend();
    info!("---- Running benchmark for {backend} in scope {scope} ----");

    let mut cleanup = IndexCleanup::new(bench, scope, indexes);
    let outcome = async {
        bench.create_indexes(scope, indexes).await?;
        let value = task().await?;
        let index_info = bench.indexes_info(scope).await;
        Ok::<_, BenchError>((value, index_info))
    }
    .await;
    cleanup.run().await;

    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            error!(backend = backend.id(); "Benchmark failed for {backend}: {e}");
            None
        }
    }
}

/// Drops requested indexes exactly once: inline through [`IndexCleanup::run`],
/// or from a spawned task if the owning future is cancelled first.
struct IndexCleanup {
    bench: Arc<dyn BenchBackend>,
    scope: String,
    indexes: Vec<IndexSpec>,
    pending: bool,
}

impl IndexCleanup {
    fn new(bench: &Arc<dyn BenchBackend>, scope: &str, indexes: &[IndexSpec]) -> Self {
        Self {
            bench: bench.clone(),
            scope: scope.to_string(),
            indexes: indexes.to_vec(),
            pending: !indexes.is_empty(),
        }
    }

    async fn run(&mut self) {
        if !self.pending {
            return;
        }
        self.pending = false;
        drop_indexes(&self.bench, &self.scope, &self.indexes).await;
    }
}

impl Drop for IndexCleanup {
    fn drop(&mut self) {
        if !self.pending {
            return;
        }
        let backend = self.bench.backend();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("Benchmark for {backend} cancelled outside a runtime, indexes left in place");
            return;
        };
        warn!("Benchmark for {backend} cancelled, dropping indexes in the background");
        let bench = self.bench.clone();
        let scope = std::mem::take(&mut self.scope);
        let indexes = std::mem::take(&mut self.indexes);
        runtime.spawn(async move {
            drop_indexes(&bench, &scope, &indexes).await;
        });
    }
}

async fn drop_indexes(bench: &Arc<dyn BenchBackend>, scope: &str, indexes: &[IndexSpec]) {
    let backend = bench.backend();
    info!("Dropping indexes for {backend}");
    if let Err(e) = bench.drop_indexes(scope, indexes).await {
        error!("Dropping indexes failed for {backend}: {e}");
    }
}

