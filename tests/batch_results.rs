//! BatchResults semantics against scripted in-memory transports.

mod common;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use common::{Event, Recorder};
use pgbatch::protocol::types::oid;
use pgbatch::sync::{
    BatchResults, MultiResultReader, Pipeline, PipelineResult, ResultReader,
};
use pgbatch::{Batch, BatchState, Column, CommandTag, Error, ErrorFields, FormatCode, Row};

type Log = Rc<RefCell<Vec<&'static str>>>;

enum Scripted {
    Rows(Vec<i32>, &'static str),
    Command(&'static str),
    /// Rows followed by an error before the completion tag
    FailMidway(Vec<i32>, Error),
    Fail(Error),
    CopyIn,
}

struct MockReader {
    columns: Arc<[Column]>,
    rows: VecDeque<Row>,
    tag: CommandTag,
    fail: Option<Error>,
}

impl MockReader {
    fn new(values: Vec<i32>, tag: &str, fail: Option<Error>) -> Self {
        let columns: Arc<[Column]> = Arc::from(vec![Column::new("x", oid::INT4, FormatCode::Binary)]);
        let rows = values
            .into_iter()
            .map(|v| Row::new(columns.clone(), vec![Some(v.to_be_bytes().to_vec())]).unwrap())
            .collect();
        Self {
            columns,
            rows,
            tag: CommandTag::new(tag),
            fail,
        }
    }
}

impl ResultReader for MockReader {
    fn fields(&self) -> Option<&[Column]> {
        Some(&self.columns)
    }

    fn next_row(&mut self) -> pgbatch::Result<Option<Row>> {
        if let Some(row) = self.rows.pop_front() {
            return Ok(Some(row));
        }
        match &self.fail {
            Some(err) => Err(err.clone()),
            None => Ok(None),
        }
    }

    fn finish(&mut self) -> pgbatch::Result<CommandTag> {
        self.rows.clear();
        match &self.fail {
            Some(err) => Err(err.clone()),
            None => Ok(self.tag.clone()),
        }
    }
}

fn reader_for(scripted: Scripted) -> Result<Option<MockReader>, Error> {
    match scripted {
        Scripted::Rows(values, tag) => Ok(Some(MockReader::new(values, tag, None))),
        Scripted::Command(tag) => Ok(Some(MockReader::new(Vec::new(), tag, None))),
        Scripted::FailMidway(values, err) => Ok(Some(MockReader::new(values, "", Some(err)))),
        Scripted::Fail(err) => Err(err),
        Scripted::CopyIn => Ok(None),
    }
}

struct MockPipeline {
    results: VecDeque<Scripted>,
    current: Option<MockReader>,
    close_result: pgbatch::Result<()>,
    log: Log,
}

impl Pipeline for MockPipeline {
    fn get_results(&mut self) -> pgbatch::Result<Option<PipelineResult<'_>>> {
        self.log.borrow_mut().push("get_results");
        let Some(next) = self.results.pop_front() else {
            return Ok(None);
        };
        match reader_for(next)? {
            Some(reader) => {
                self.current = Some(reader);
                Ok(self.current.as_mut().map(|r| PipelineResult::Rows(r)))
            }
            None => Ok(Some(PipelineResult::CopyIn)),
        }
    }

    fn close(&mut self) -> pgbatch::Result<()> {
        self.log.borrow_mut().push("close");
        self.close_result.clone()
    }
}

struct MockMultiReader {
    results: VecDeque<Scripted>,
    current: Option<MockReader>,
    first_err: Option<Error>,
    log: Log,
}

impl MultiResultReader for MockMultiReader {
    fn next_result(&mut self) -> bool {
        self.log.borrow_mut().push("next_result");
        if self.first_err.is_some() {
            return false;
        }
        let Some(next) = self.results.pop_front() else {
            return false;
        };
        match reader_for(next) {
            Ok(Some(reader)) => {
                self.current = Some(reader);
                true
            }
            Ok(None) => false,
            Err(err) => {
                self.first_err = Some(err);
                false
            }
        }
    }

    fn result_reader(&mut self) -> &mut dyn ResultReader {
        self.current.as_mut().unwrap()
    }

    fn close(&mut self) -> pgbatch::Result<()> {
        self.log.borrow_mut().push("close");
        match &self.first_err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn batch(queries: &[&str]) -> Batch {
    let mut batch = Batch::new();
    for query in queries {
        batch.queue(*query, ());
    }
    batch
}

fn pipelined(
    queries: &[&str],
    results: Vec<Scripted>,
    tracer: Option<Arc<Recorder>>,
) -> (BatchResults<'static>, Log) {
    let log = Log::default();
    let pipeline = MockPipeline {
        results: results.into(),
        current: None,
        close_result: Ok(()),
        log: log.clone(),
    };
    let tracer = tracer.map(|t| t as Arc<dyn pgbatch::BatchTracer>);
    (BatchResults::pipelined(batch(queries), tracer, pipeline), log)
}

fn simple(
    queries: &[&str],
    results: Vec<Scripted>,
    tracer: Option<Arc<Recorder>>,
) -> (BatchResults<'static>, Log) {
    let log = Log::default();
    let reader = MockMultiReader {
        results: results.into(),
        current: None,
        first_err: None,
        log: log.clone(),
    };
    let tracer = tracer.map(|t| t as Arc<dyn pgbatch::BatchTracer>);
    (BatchResults::simple(batch(queries), tracer, reader), log)
}

fn server_error(code: &str) -> Error {
    Error::Server(ErrorFields {
        severity: Some("ERROR".into()),
        code: Some(code.into()),
        message: Some("boom".into()),
        ..Default::default()
    })
}

#[test]
fn exec_returns_tags_in_order_then_no_result() {
    for (mut results, _) in [
        pipelined(
            &["INSERT 1", "INSERT 2", "DELETE"],
            vec![
                Scripted::Command("INSERT 0 1"),
                Scripted::Command("INSERT 0 2"),
                Scripted::Command("DELETE 3"),
            ],
            None,
        ),
        simple(
            &["INSERT 1", "INSERT 2", "DELETE"],
            vec![
                Scripted::Command("INSERT 0 1"),
                Scripted::Command("INSERT 0 2"),
                Scripted::Command("DELETE 3"),
            ],
            None,
        ),
    ] {
        assert_eq!(results.exec().unwrap().as_str(), "INSERT 0 1");
        assert_eq!(results.exec().unwrap().as_str(), "INSERT 0 2");
        assert_eq!(results.exec().unwrap().rows_affected(), 3);
        assert!(matches!(results.exec(), Err(Error::NoResult)));
        assert!(matches!(results.state(), BatchState::Errored(Error::NoResult)));
        // sticky
        assert!(matches!(results.exec(), Err(Error::NoResult)));
        assert!(matches!(results.close(), Err(Error::NoResult)));
    }
}

#[test]
fn clean_close() {
    let (mut results, log) = pipelined(
        &["UPDATE t SET x = 1"],
        vec![Scripted::Command("UPDATE 1")],
        None,
    );
    assert!(results.exec().is_ok());
    assert!(results.close().is_ok());
    assert!(matches!(results.state(), BatchState::Closed(None)));
    assert_eq!(*log.borrow(), vec!["get_results", "close"]);
}

#[test]
fn close_is_idempotent_without_transport_calls() {
    let (mut results, log) = simple(&["SELECT 1"], vec![Scripted::Rows(vec![1], "SELECT 1")], None);
    assert!(results.close().is_ok());
    let calls = log.borrow().len();
    assert!(results.close().is_ok());
    assert_eq!(log.borrow().len(), calls);

    let (mut results, log) = pipelined(
        &["SELECT 1"],
        vec![Scripted::Fail(server_error("42601"))],
        None,
    );
    assert_eq!(results.exec().unwrap_err().sqlstate(), Some("42601"));
    assert_eq!(results.close().unwrap_err().sqlstate(), Some("42601"));
    let calls = log.borrow().len();
    assert_eq!(results.close().unwrap_err().sqlstate(), Some("42601"));
    assert_eq!(log.borrow().len(), calls);
}

#[test]
fn use_after_close_is_rejected() {
    let (mut results, log) = pipelined(&[], Vec::new(), None);
    assert!(results.close().is_ok());
    let calls = log.borrow().len();
    assert!(matches!(results.exec(), Err(Error::BatchClosed)));
    assert!(matches!(results.query(), Err(Error::BatchClosed)));
    assert_eq!(log.borrow().len(), calls);
}

#[test]
fn every_item_is_traced_once() {
    for simple_mode in [false, true] {
        let recorder = Recorder::new();
        let queries = ["SELECT 1", "INSERT 1", "INSERT 2"];
        let scripted = vec![
            Scripted::Rows(vec![1], "SELECT 1"),
            Scripted::Command("INSERT 0 1"),
            Scripted::Command("INSERT 0 1"),
        ];
        let (mut results, _) = if simple_mode {
            simple(&queries, scripted, Some(recorder.clone()))
        } else {
            pipelined(&queries, scripted, Some(recorder.clone()))
        };

        let mut rows = results.query().unwrap();
        assert_eq!(rows.next_row().unwrap().unwrap().get::<i32>(0).unwrap(), 1);
        drop(rows);
        assert!(results.close().is_ok());
        assert!(results.close().is_ok());

        assert_eq!(recorder.query_count(), 3);
        assert_eq!(recorder.end_count(), 1);
        let events = recorder.events();
        assert_eq!(
            events[0],
            Event::Query {
                sql: "SELECT 1".into(),
                tag: Some("SELECT 1".into()),
                err: None,
            }
        );
        assert_eq!(events[3], Event::End { err: None });
    }
}

#[test]
fn untraced_items_fail_with_the_stored_error() {
    let recorder = Recorder::new();
    let (mut results, log) = pipelined(
        &["A", "B", "C"],
        vec![
            Scripted::Fail(server_error("22012")),
            Scripted::Command("B"),
            Scripted::Command("C"),
        ],
        Some(recorder.clone()),
    );
    assert!(results.exec().is_err());
    assert!(results.close().is_err());

    // the remaining items are reported without asking the transport
    assert_eq!(*log.borrow(), vec!["get_results", "close"]);
    let events = recorder.events();
    assert_eq!(events.len(), 4);
    for event in &events[..3] {
        let Event::Query { err, .. } = event else {
            panic!("expected query event");
        };
        assert!(err.as_deref().unwrap().contains("22012"));
    }
    assert!(matches!(&events[3], Event::End { err: Some(_) }));
}

#[test]
fn erred_row_stream_short_circuits_next_request() {
    let (mut results, log) = pipelined(
        &["SELECT 1", "SELECT 2", "SELECT 3"],
        vec![
            Scripted::Rows(vec![1], "SELECT 1"),
            Scripted::FailMidway(vec![7], server_error("57014")),
            Scripted::Command("SELECT 0"),
        ],
        None,
    );
    assert!(results.exec().is_ok());

    let mut rows = results.query().unwrap();
    assert!(rows.next_row().unwrap().is_some());
    assert_eq!(rows.next_row().unwrap_err().sqlstate(), Some("57014"));
    drop(rows);

    let calls = log.borrow().len();
    assert_eq!(results.exec().unwrap_err().sqlstate(), Some("57014"));
    assert_eq!(log.borrow().len(), calls);
    assert_eq!(results.query().err().unwrap().sqlstate(), Some("57014"));
    assert_eq!(results.close().unwrap_err().sqlstate(), Some("57014"));
}

#[test]
fn unsupported_pipeline_result_errors_the_batch() {
    let (mut results, _) = pipelined(&["COPY t FROM STDIN"], vec![Scripted::CopyIn], None);
    let err = results.exec().unwrap_err();
    assert!(matches!(err, Error::UnexpectedPipelineResult("CopyIn")));
    assert!(err.is_connection_broken());
    assert!(matches!(
        results.close(),
        Err(Error::UnexpectedPipelineResult("CopyIn"))
    ));
}

#[test]
fn close_error_used_when_batch_succeeded() {
    let log = Log::default();
    let pipeline = MockPipeline {
        results: VecDeque::new(),
        current: None,
        close_result: Err(Error::ConnectionBroken),
        log: log.clone(),
    };
    let mut results = BatchResults::pipelined(Batch::new(), None, pipeline);
    assert!(matches!(results.close(), Err(Error::ConnectionBroken)));
    assert!(matches!(results.close(), Err(Error::ConnectionBroken)));
    assert_eq!(*log.borrow(), vec!["close"]);
}

#[test]
fn simple_exhaustion_surfaces_the_close_error() {
    let (mut results, _) = simple(
        &["INSERT 1", "INSERT 2"],
        vec![Scripted::Command("INSERT 0 1"), Scripted::Fail(server_error("23505"))],
        None,
    );
    assert!(results.exec().is_ok());
    assert_eq!(results.exec().unwrap_err().sqlstate(), Some("23505"));
    assert_eq!(results.close().unwrap_err().sqlstate(), Some("23505"));
}

#[test]
fn query_row_scans_the_first_row() {
    let (mut results, _) = pipelined(
        &["SELECT none", "SELECT many", "SELECT one"],
        vec![
            Scripted::Rows(Vec::new(), "SELECT 0"),
            Scripted::Rows(vec![10, 20, 30], "SELECT 3"),
            Scripted::Rows(vec![5], "SELECT 1"),
        ],
        None,
    );
    assert!(matches!(
        results.query_row().scan::<(i32,)>(),
        Err(Error::NoRows)
    ));
    assert_eq!(results.query_row().scan::<(i32,)>().unwrap(), (10,));
    assert_eq!(results.query_row().scan::<(i32,)>().unwrap(), (5,));
    assert!(results.close().is_ok());
}

#[test]
fn insert_select_update_scenario() {
    let recorder = Recorder::new();
    let (mut results, _) = simple(
        &[
            "INSERT INTO t VALUES (1)",
            "SELECT x FROM t",
            "UPDATE t SET x=2",
        ],
        vec![
            Scripted::Command("INSERT 0 1"),
            Scripted::Rows(vec![1], "SELECT 1"),
            Scripted::Command("UPDATE 1"),
        ],
        Some(recorder.clone()),
    );
    let insert = results.exec().unwrap();
    assert!(insert.is_insert());
    assert_eq!(insert.rows_affected(), 1);

    let mut rows = results.query().unwrap();
    assert_eq!(rows.fields().unwrap()[0].name, "x");
    let xs: Vec<(i32,)> = rows.collect().unwrap();
    assert_eq!(xs, vec![(1,)]);
    assert_eq!(rows.command_tag().unwrap().as_str(), "SELECT 1");
    drop(rows);

    assert_eq!(results.exec().unwrap().as_str(), "UPDATE 1");
    assert!(results.close().is_ok());
    assert_eq!(recorder.query_count(), 3);
    assert_eq!(recorder.end_count(), 1);
}

#[test]
fn dropping_results_closes_them() {
    let recorder = Recorder::new();
    let (results, log) = pipelined(
        &["A", "B"],
        vec![Scripted::Command("A"), Scripted::Command("B")],
        Some(recorder.clone()),
    );
    drop(results);
    assert_eq!(*log.borrow(), vec!["get_results", "get_results", "close"]);
    assert_eq!(recorder.query_count(), 2);
    assert_eq!(recorder.end_count(), 1);
}
