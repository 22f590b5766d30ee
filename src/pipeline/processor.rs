// src/pipeline/processor.rs
use std::io::BufRead;
use std::sync::Arc;

use crate::debug_log::DebugLog;
use crate::error::Result;
use crate::pipeline::config::ProcessorConfig;
use crate::pipeline::context::{Context, JobStats, LineOutcome};
use crate::pipeline::job::{Job, JobFinishedHook};
use crate::plugin::{
    CleanPlugin, ConsolidatePlugin, CreatePlugin, MetadataPlugin, ParseFormatPlugin, ParsePlugin,
    Plugin, PluginRegistry, PostProcessPlugin, SequencePlugin, StructurePlugin,
};
use crate::sink::Sink;
use crate::source::{LineSource, ReaderLineSource};

/// Holds the plugin set and configuration shared by every job it creates
pub struct Processor {
    plugins: Arc<PluginRegistry>,
    config: ProcessorConfig,
    debug_log: Option<Arc<dyn DebugLog>>,
    hooks: Vec<JobFinishedHook>,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new(ProcessorConfig::default())
    }
}

impl Processor {
    pub fn new(config: ProcessorConfig) -> Self {
        Processor {
            plugins: Arc::new(PluginRegistry::new()),
            config,
            debug_log: None,
            hooks: Vec::new(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Registered plugins only affect jobs created afterwards
    fn registry_mut(&mut self) -> &mut PluginRegistry {
        Arc::make_mut(&mut self.plugins)
    }

    pub fn register<P: Plugin + 'static>(&mut self, plugin: Arc<P>) -> &mut Self {
        self.registry_mut().register(plugin);
        self
    }

    pub fn register_clean(&mut self, plugin: Arc<dyn CleanPlugin>) -> &mut Self {
        self.registry_mut().register_clean(plugin);
        self
    }

    pub fn register_metadata(&mut self, plugin: Arc<dyn MetadataPlugin>) -> &mut Self {
        self.registry_mut().register_metadata(plugin);
        self
    }

    pub fn register_structure(&mut self, plugin: Arc<dyn StructurePlugin>) -> &mut Self {
        self.registry_mut().register_structure(plugin);
        self
    }

    pub fn register_parse(&mut self, plugin: Arc<dyn ParsePlugin>) -> &mut Self {
        self.registry_mut().register_parse(plugin);
        self
    }

    pub fn register_sequence(&mut self, plugin: Arc<dyn SequencePlugin>) -> &mut Self {
        self.registry_mut().register_sequence(plugin);
        self
    }

    pub fn register_consolidate(&mut self, plugin: Arc<dyn ConsolidatePlugin>) -> &mut Self {
        self.registry_mut().register_consolidate(plugin);
        self
    }

    pub fn register_parse_format(&mut self, plugin: Arc<dyn ParseFormatPlugin>) -> &mut Self {
        self.registry_mut().register_parse_format(plugin);
        self
    }

    pub fn register_create(&mut self, plugin: Arc<dyn CreatePlugin>) -> &mut Self {
        self.registry_mut().register_create(plugin);
        self
    }

    pub fn register_post_process(&mut self, plugin: Arc<dyn PostProcessPlugin>) -> &mut Self {
        self.registry_mut().register_post_process(plugin);
        self
    }

    pub fn with_debug_log(mut self, debug_log: Arc<dyn DebugLog>) -> Self {
        self.debug_log = Some(debug_log);
        self
    }

    pub fn on_job_finished<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Context, &JobStats) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn new_job<S: Sink>(&self, sink: S) -> Job<S> {
        Job::new(self.plugins.clone(), self.config.job.clone(), sink)
            .with_debug_log(self.debug_log.clone())
            .with_hooks(self.hooks.clone())
    }

    /// Process every line of `reader` in a fresh job
    pub fn process_reader<R: BufRead, S: Sink>(&self, ctx: &Context, reader: R, sink: S) -> Result<S> {
        let mut source = ReaderLineSource::new(reader, self.config.buffer_size);
        self.process_source(ctx, &mut source, sink)
    }

    /// Process every line of `source` in a fresh job
    pub fn process_source<L: LineSource + ?Sized, S: Sink>(
        &self,
        ctx: &Context,
        source: &mut L,
        sink: S,
    ) -> Result<S> {
        let job = self.new_job(sink);
        while let Some(line) = source.next_line(ctx)? {
            if job.process_line(ctx, line)? == LineOutcome::Finished {
                break;
            }
        }
        if ctx.is_cancelled() {
            tracing::debug!("processing cancelled, finishing job");
        }
        job.finish(ctx)
    }
}
