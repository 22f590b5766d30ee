// tests/job_tests.rs
use chrono::{DateTime, TimeZone, Utc};
use logfold::error::Stage;
use logfold::plugin::{
    CleanPlugin, ConsolidatePlugin, CreatePlugin, MetadataPlugin, ParseFormatPlugin, ParsePlugin,
    PostProcessPlugin, StructurePlugin,
};
use logfold::record::joined_text;
use logfold::{
    Context, DebugLog, FnSink, Job, JobOptions, LineOutcome, PluginRegistry, ProcessingError,
    Record, SourceLine, VecSink,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn run_lines(registry: PluginRegistry, options: JobOptions, lines: &[&str]) -> Vec<Record> {
    let ctx = Context::new();
    let job = Job::new(Arc::new(registry), options, VecSink::new());
    for line in lines {
        if job.process_line(&ctx, (*line).into()).unwrap() == LineOutcome::Finished {
            break;
        }
    }
    job.finish(&ctx).unwrap().into_records()
}

fn texts(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.text.as_str()).collect()
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Reads a leading `@<unix seconds>` token into the timestamp metadata
struct TimestampPrefix;

impl MetadataPlugin for TimestampPrefix {
    fn extract_metadata(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
        let Some(rest) = record.text.strip_prefix('@') else {
            return Ok(false);
        };
        let (secs, message) = rest.split_once(' ').unwrap_or((rest, ""));
        let secs: i64 = secs.parse()?;
        let message = message.to_string();
        record.metadata.set("ts", at(secs));
        record.text = message;
        Ok(true)
    }
}

/// Drops records whose text contains "drop"
struct DropMarked;

impl PostProcessPlugin for DropMarked {
    fn post_process(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
        if record.text.contains("drop") {
            record.metadata.set("skip", true);
            return Ok(true);
        }
        Ok(false)
    }
}

#[test]
fn test_untouched_line() {
    let records = run_lines(PluginRegistry::new(), JobOptions::default(), &["  hello world \t"]);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.text, "hello world");
    assert_eq!((record.line_number, record.line_count), (1, 1));
    assert!(record.metadata.timestamp_value("ts").is_some());
    assert!(record.metadata.bool_value("ts_calc"));
}

#[test]
fn test_blank_lines_are_invisible() {
    let ctx = Context::new();
    let job = Job::new(Arc::new(PluginRegistry::new()), JobOptions::default(), VecSink::new());

    assert_eq!(job.process_line(&ctx, "first".into()).unwrap(), LineOutcome::Accepted);
    assert_eq!(job.process_line(&ctx, "".into()).unwrap(), LineOutcome::Skipped);
    assert_eq!(job.process_line(&ctx, "   ".into()).unwrap(), LineOutcome::Skipped);
    assert_eq!(job.process_line(&ctx, "fourth".into()).unwrap(), LineOutcome::Accepted);

    let records = job.finish(&ctx).unwrap().into_records();
    assert_eq!(texts(&records), vec!["first", "fourth"]);
    assert_eq!(records[1].line_number, 4);
}

#[test]
fn test_backlog_cap_forces_flush() {
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let sink_emitted = emitted.clone();
    let sink = FnSink(move |r: Record| sink_emitted.lock().unwrap().push(r));

    let options = JobOptions {
        max_backlog_lines: 3,
        ..JobOptions::default()
    };
    let job = Job::new(Arc::new(PluginRegistry::new()), options, sink);
    let ctx = Context::new();

    for line in ["a", "b", "c"] {
        job.process_line(&ctx, line.into()).unwrap();
    }
    assert!(emitted.lock().unwrap().is_empty());

    job.process_line(&ctx, "d".into()).unwrap();
    {
        let records = emitted.lock().unwrap();
        assert_eq!(texts(&records), vec!["a", "b", "c", "d"]);
        assert!(records.iter().all(|r| r.line_count == 1));
    }
    assert_eq!(job.stats().forced_flushes, 1);

    job.process_line(&ctx, "e".into()).unwrap();
    job.finish(&ctx).unwrap();
    assert_eq!(emitted.lock().unwrap().len(), 5);
}

struct Greedy(usize);

impl ConsolidatePlugin for Greedy {
    fn consolidate(
        &self,
        _ctx: &Context,
        lines: &[Record],
        _record: &mut Record,
    ) -> anyhow::Result<Option<usize>> {
        Ok(Some(lines.len() + self.0))
    }
}

#[test]
fn test_consolidate_overrun_fails() {
    let mut registry = PluginRegistry::new();
    registry.register_consolidate(Arc::new(Greedy(1)));
    let job = Job::new(Arc::new(registry), JobOptions::default(), VecSink::new());
    let ctx = Context::new();
    job.process_line(&ctx, "a".into()).unwrap();
    job.process_line(&ctx, "b".into()).unwrap();

    match job.finish(&ctx) {
        Err(ProcessingError::ConsolidateOverrun {
            requested,
            available,
        }) => assert_eq!((requested, available), (3, 2)),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("overrun must fail the job"),
    }
}

#[test]
fn test_consolidate_folds_prefix_and_retries() {
    // Consumes two lines when the window starts with "begin"
    struct Pairs;
    impl ConsolidatePlugin for Pairs {
        fn consolidate(
            &self,
            _ctx: &Context,
            lines: &[Record],
            record: &mut Record,
        ) -> anyhow::Result<Option<usize>> {
            if lines[0].text == "begin" && lines.len() >= 2 {
                record.text = format!("{}+{}", lines[0].text, lines[1].text);
                return Ok(Some(2));
            }
            Ok(None)
        }
    }

    let mut registry = PluginRegistry::new();
    registry.register_consolidate(Arc::new(Pairs));
    let options = JobOptions {
        include_source: true,
        ..JobOptions::default()
    };
    let records = run_lines(registry, options, &["x", "begin", "end", "y"]);

    assert_eq!(texts(&records), vec!["x", "begin+end", "y"]);
    assert_eq!((records[1].line_number, records[1].line_count), (2, 2));
    assert_eq!(records[1].rendered_source, "begin\nend");
}

#[test]
fn test_post_process_order() {
    struct Suffix(i32);
    impl PostProcessPlugin for Suffix {
        fn order(&self) -> i32 {
            self.0
        }
        fn post_process(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
            record.text = format!("{}_{}", record.text, self.0);
            Ok(true)
        }
    }

    let mut registry = PluginRegistry::new();
    for order in [5, 2, 10, 7, 1, 7] {
        registry.register_post_process(Arc::new(Suffix(order)));
    }
    let records = run_lines(registry, JobOptions::default(), &["line"]);

    assert_eq!(texts(&records), vec!["line_1_2_5_7_7_10"]);
}

struct Neighbours {
    calls: AtomicUsize,
}

impl CreatePlugin for Neighbours {
    fn create_before(&self, _ctx: &Context, record: &Record) -> anyhow::Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Record::new().with_text(format!("{}-before", record.line_number))])
    }

    fn create_after(&self, _ctx: &Context, record: &Record) -> anyhow::Result<Vec<Record>> {
        Ok(vec![Record::new().with_text(format!("{}-after", record.line_number))])
    }
}

struct TagCreated;

impl PostProcessPlugin for TagCreated {
    fn post_process(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
        let suffix = if record.metadata.bool_value("created") {
            "create"
        } else {
            "default"
        };
        record.text = format!("{}-{}", record.text, suffix);
        Ok(true)
    }
}

struct FormatAll;

impl ParseFormatPlugin for FormatAll {
    fn parse_format(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
        record.metadata.set("format", "guessed");
        Ok(true)
    }
}

#[test]
fn test_create_before_and_after() {
    let creator = Arc::new(Neighbours {
        calls: AtomicUsize::new(0),
    });
    let mut registry = PluginRegistry::new();
    registry.register_create(creator.clone());
    registry.register_post_process(Arc::new(TagCreated));
    registry.register_parse_format(Arc::new(FormatAll));

    let records = run_lines(registry, JobOptions::default(), &["a", "b"]);

    assert_eq!(
        texts(&records),
        vec![
            "1-before-create",
            "a-default",
            "1-after-create",
            "2-before-create",
            "b-default",
            "2-after-create",
        ]
    );
    // Created records never trigger creation themselves
    assert_eq!(creator.calls.load(Ordering::SeqCst), 2);
    for record in &records {
        assert_eq!(
            record.metadata.bool_value("created"),
            record.text.ends_with("-create")
        );
        assert_eq!(record.metadata.string_value("format"), "guessed");
    }
}

#[test]
fn test_parse_format_skipped_when_format_known() {
    struct KnownFormat;
    impl MetadataPlugin for KnownFormat {
        fn extract_metadata(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
            if record.text.starts_with("nginx") {
                record.metadata.set("format", "nginx");
            }
            Ok(true)
        }
    }

    let mut registry = PluginRegistry::new();
    registry.register_metadata(Arc::new(KnownFormat));
    registry.register_parse_format(Arc::new(FormatAll));
    let records = run_lines(registry, JobOptions::default(), &["nginx GET /", "other"]);

    assert_eq!(records[0].metadata.string_value("format"), "nginx");
    assert_eq!(records[1].metadata.string_value("format"), "guessed");
}

#[test]
fn test_carried_timestamp_and_skip() {
    let mut registry = PluginRegistry::new();
    registry.register_metadata(Arc::new(TimestampPrefix));
    registry.register_post_process(Arc::new(DropMarked));

    let records = run_lines(
        registry,
        JobOptions::default(),
        &["@100 first", "continued", "@200 drop me", "after drop", "@300 third"],
    );

    assert_eq!(
        texts(&records),
        vec!["first", "continued", "after drop", "third"]
    );
    assert_eq!(records[0].metadata.timestamp_value("ts"), Some(at(100)));
    assert!(!records[0].metadata.bool_value("ts_calc"));
    assert_eq!(records[1].metadata.timestamp_value("ts"), Some(at(100)));
    assert!(records[1].metadata.bool_value("ts_calc"));
    // The skipped record's timestamp is not carried forward
    assert_eq!(records[2].metadata.timestamp_value("ts"), Some(at(100)));
    assert_eq!(records[3].metadata.timestamp_value("ts"), Some(at(300)));
}

#[test]
fn test_line_window() {
    let options = JobOptions {
        start_line: 2,
        line_amount: Some(2),
        ..JobOptions::default()
    };
    let ctx = Context::new();
    let job = Job::new(Arc::new(PluginRegistry::new()), options, VecSink::new());

    let outcomes: Vec<LineOutcome> = ["l1", "l2", "l3", "l4", "l5"]
        .iter()
        .map(|l| job.process_line(&ctx, (*l).into()).unwrap())
        .collect();
    assert_eq!(
        outcomes,
        vec![
            LineOutcome::Skipped,
            LineOutcome::Accepted,
            LineOutcome::Accepted,
            LineOutcome::Accepted,
            LineOutcome::Finished,
        ]
    );

    let records = job.finish(&ctx).unwrap().into_records();
    assert_eq!(texts(&records), vec!["l2", "l3", "l4"]);
    assert_eq!(records[0].line_number, 2);
}

#[test]
fn test_source_retention() {
    struct StripLevel;
    impl MetadataPlugin for StripLevel {
        fn extract_metadata(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
            if let Some(rest) = record.text.strip_prefix("INFO ") {
                let rest = rest.to_string();
                record.metadata.set("level", "info");
                record.text = rest;
                return Ok(true);
            }
            Ok(false)
        }
    }

    let mut registry = PluginRegistry::new();
    registry.register_metadata(Arc::new(StripLevel));

    let kept = run_lines(
        registry.clone(),
        JobOptions {
            include_source: true,
            ..JobOptions::default()
        },
        &["  INFO ready  "],
    );
    assert_eq!(kept[0].text, "ready");
    assert_eq!(kept[0].raw_source, "  INFO ready  ");
    assert_eq!(kept[0].rendered_source, "ready");

    let dropped = run_lines(registry, JobOptions::default(), &["  INFO ready  "]);
    assert!(dropped[0].raw_source.is_empty());
    assert!(dropped[0].rendered_source.is_empty());
}

#[test]
fn test_prebuilt_record_input() {
    let mut prebuilt = Record::new().with_text("from upstream").with_line_number(99);
    prebuilt.data.set("origin", "queue");
    prebuilt.raw_source = "raw bytes".into();
    prebuilt.rendered_source = "stale".into();

    let ctx = Context::new();
    let job = Job::new(Arc::new(PluginRegistry::new()), JobOptions::default(), VecSink::new());
    job.process_line(&ctx, "plain".into()).unwrap();
    job.process_line(&ctx, SourceLine::Record(prebuilt)).unwrap();
    let records = job.finish(&ctx).unwrap().into_records();

    assert_eq!(records[1].line_number, 2);
    assert_eq!(records[1].text, "from upstream");
    assert_eq!(records[1].data.string_value("origin"), "queue");
    assert!(records[1].raw_source.is_empty());
    assert!(records[1].rendered_source.is_empty());
}

#[test]
fn test_plugin_error_reports_stage_and_line() {
    struct Picky;
    impl CleanPlugin for Picky {
        fn clean(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
            if record.text == "bad" {
                anyhow::bail!("cannot clean");
            }
            Ok(false)
        }
    }

    let mut registry = PluginRegistry::new();
    registry.register_clean(Arc::new(Picky));
    let job = Job::new(Arc::new(registry), JobOptions::default(), VecSink::new());
    let ctx = Context::new();

    job.process_line(&ctx, "good".into()).unwrap();
    let err = job.process_line(&ctx, "bad".into()).unwrap_err();
    match err {
        ProcessingError::Plugin { stage, line, .. } => {
            assert_eq!(stage, Stage::Clean);
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_noop_plugins_round_trip() {
    struct Noop;
    impl CleanPlugin for Noop {
        fn clean(&self, _: &Context, _: &mut Record) -> anyhow::Result<bool> {
            Ok(false)
        }
    }
    impl MetadataPlugin for Noop {
        fn extract_metadata(&self, _: &Context, _: &mut Record) -> anyhow::Result<bool> {
            Ok(false)
        }
    }
    impl ParsePlugin for Noop {
        fn extract_parse(&self, _: &Context, _: &[Record], _: &mut Record) -> anyhow::Result<bool> {
            Ok(false)
        }
    }
    impl PostProcessPlugin for Noop {
        fn post_process(&self, _: &Context, _: &mut Record) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    let noop = Arc::new(Noop);
    let mut registry = PluginRegistry::new();
    registry.register_clean(noop.clone());
    registry.register_metadata(noop.clone());
    registry.register_parse(noop.clone());
    registry.register_post_process(noop);

    let input = ["GET /index.html 200", "  padded\t", "ünïcödé ✓"];
    let records = run_lines(registry, JobOptions::default(), &input);
    assert_eq!(
        texts(&records),
        input.iter().map(|l| l.trim()).collect::<Vec<_>>()
    );
}

#[test]
fn test_zero_line_amount_is_unlimited() {
    let options = JobOptions {
        line_amount: Some(0),
        ..JobOptions::default()
    };
    let records = run_lines(PluginRegistry::new(), options, &["a", "b", "c"]);
    assert_eq!(texts(&records), vec!["a", "b", "c"]);
}

/// Logs create calls and debug-log records into a shared trace
struct Recorder {
    trace: Arc<Mutex<Vec<String>>>,
    fail_after: bool,
}

impl CreatePlugin for Recorder {
    fn create_before(&self, _ctx: &Context, record: &Record) -> anyhow::Result<Vec<Record>> {
        self.trace
            .lock()
            .unwrap()
            .push(format!("create_before({})", record.text));
        Ok(vec![Record::new().with_text("pre")])
    }

    fn create_after(&self, _ctx: &Context, record: &Record) -> anyhow::Result<Vec<Record>> {
        self.trace
            .lock()
            .unwrap()
            .push(format!("create_after({})", record.text));
        if self.fail_after {
            anyhow::bail!("create_after failed");
        }
        Ok(Vec::new())
    }
}

impl DebugLog for Recorder {
    fn log_source_line(&self, _ctx: &Context, _line_number: usize, _line: &str, _raw: &str) {}

    fn log_record(&self, _ctx: &Context, record: &Record) {
        self.trace.lock().unwrap().push(format!("log({})", record.text));
    }
}

fn run_recorded(fail_after: bool) -> (Result<(), ProcessingError>, Vec<String>) {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::new(Recorder {
        trace: trace.clone(),
        fail_after,
    });
    let mut registry = PluginRegistry::new();
    registry.register_create(recorder.clone());

    let sink_trace = trace.clone();
    let sink = FnSink(move |r: Record| sink_trace.lock().unwrap().push(format!("sink({})", r.text)));
    let debug_log: Arc<dyn DebugLog> = recorder;
    let job = Job::new(Arc::new(registry), JobOptions::default(), sink)
        .with_debug_log(Some(debug_log));

    let ctx = Context::new();
    job.process_line(&ctx, "x".into()).unwrap();
    let result = job.finish(&ctx).map(|_| ());
    let entries = trace.lock().unwrap().clone();
    (result, entries)
}

#[test]
fn test_create_after_runs_once_sink_has_record() {
    let (result, trace) = run_recorded(false);
    assert!(result.is_ok());
    assert_eq!(
        trace,
        vec![
            "create_before(x)",
            "log(pre)",
            "sink(pre)",
            "log(x)",
            "sink(x)",
            "create_after(x)",
        ]
    );
}

#[test]
fn test_failing_create_after_keeps_delivered_record() {
    let (result, trace) = run_recorded(true);
    match result {
        Err(ProcessingError::Plugin { stage, line, .. }) => {
            assert_eq!((stage, line), (Stage::Create, 1));
        }
        other => panic!("expected a create failure, got {:?}", other),
    }
    assert_eq!(trace[trace.len() - 2..], ["sink(x)", "create_after(x)"]);
}

/// Structure match for windows opening with `{` and closing with `}`
struct Braces {
    ts: Option<i64>,
}

impl StructurePlugin for Braces {
    fn extract_structure(
        &self,
        _ctx: &Context,
        lines: &[Record],
        record: &mut Record,
    ) -> anyhow::Result<bool> {
        let text = joined_text(lines);
        if !(text.starts_with('{') && text.ends_with('}')) {
            return Ok(false);
        }
        record.text = "structured".into();
        if let Some(secs) = self.ts {
            record.metadata.set("ts", at(secs));
        }
        Ok(true)
    }
}

/// Parse match for any of the listed joined windows
struct Windows(Vec<&'static str>);

impl ParsePlugin for Windows {
    fn extract_parse(
        &self,
        _ctx: &Context,
        lines: &[Record],
        record: &mut Record,
    ) -> anyhow::Result<bool> {
        if self.0.contains(&joined_text(lines).as_str()) {
            record.text = "parsed".into();
            return Ok(true);
        }
        Ok(false)
    }
}

#[test]
fn test_structure_match_preempts_parse() {
    let mut registry = PluginRegistry::new();
    registry.register_structure(Arc::new(Braces { ts: None }));
    // Would claim the longer window if parse plugins were consulted
    registry.register_parse(Arc::new(Windows(vec!["a\n{\n}", "p\nq"])));

    let ctx = Context::new();
    let job = Job::new(Arc::new(registry), JobOptions::default(), VecSink::new());
    for line in ["a", "{", "}", "p", "q"] {
        job.process_line(&ctx, line.into()).unwrap();
    }
    let (sink, stats) = job.finish_with_stats(&ctx).unwrap();
    let records = sink.into_records();

    assert_eq!((stats.structure_matches, stats.parse_matches), (1, 1));
    assert_eq!(texts(&records), vec!["a", "structured", "parsed"]);
    assert_eq!((records[1].line_number, records[1].line_count), (2, 2));
    assert_eq!((records[2].line_number, records[2].line_count), (4, 2));
}

#[test]
fn test_same_window_goes_to_first_registered() {
    struct Tag(&'static str);
    impl StructurePlugin for Tag {
        fn extract_structure(
            &self,
            _ctx: &Context,
            lines: &[Record],
            record: &mut Record,
        ) -> anyhow::Result<bool> {
            record.metadata.set("by", self.0);
            Ok(joined_text(lines) == "tie")
        }
    }

    let mut registry = PluginRegistry::new();
    registry.register_structure(Arc::new(Tag("first")));
    registry.register_structure(Arc::new(Tag("second")));
    let records = run_lines(registry, JobOptions::default(), &["tie"]);
    assert_eq!(records[0].metadata.string_value("by"), "first");

    let mut registry = PluginRegistry::new();
    registry.register_structure(Arc::new(Tag("second")));
    registry.register_structure(Arc::new(Tag("first")));
    let records = run_lines(registry, JobOptions::default(), &["tie"]);
    assert_eq!(records[0].metadata.string_value("by"), "second");
}

#[test]
fn test_match_seeds_carried_timestamp() {
    let mut registry = PluginRegistry::new();
    registry.register_structure(Arc::new(Braces { ts: Some(500) }));

    let records = run_lines(registry, JobOptions::default(), &["plain", "{", "}"]);

    assert_eq!(texts(&records), vec!["plain", "structured"]);
    assert_eq!(records[0].metadata.timestamp_value("ts"), Some(at(500)));
    assert!(records[0].metadata.bool_value("ts_calc"));
    assert_eq!(records[1].metadata.timestamp_value("ts"), Some(at(500)));
    assert!(!records[1].metadata.bool_value("ts_calc"));
}

#[test]
fn test_concurrent_feeders_lose_no_lines() {
    let ctx = Context::new();
    let job = Job::new(Arc::new(PluginRegistry::new()), JobOptions::default(), VecSink::new());

    std::thread::scope(|scope| {
        for feeder in 0..2 {
            let (job, ctx) = (&job, &ctx);
            scope.spawn(move || {
                for i in 0..100 {
                    let line = format!("feeder{}-{}", feeder, i);
                    assert_eq!(
                        job.process_line(ctx, line.into()).unwrap(),
                        LineOutcome::Accepted
                    );
                }
            });
        }
    });

    let records = job.finish(&ctx).unwrap().into_records();
    let numbers: Vec<usize> = records.iter().map(|r| r.line_number).collect();
    assert_eq!(numbers, (1..=200).collect::<Vec<_>>());
    for feeder in 0..2 {
        let prefix = format!("feeder{}-", feeder);
        assert_eq!(records.iter().filter(|r| r.text.starts_with(&prefix)).count(), 100);
    }
}
