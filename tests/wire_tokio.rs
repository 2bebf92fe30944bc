//! Async connection against scripted PostgreSQL byte streams.

mod common;

use common::{Event, Recorder, ServerScript};
use pgbatch::tokio::Conn;
use pgbatch::{Batch, BatchMode, Error, Opts};
use tokio::io::{AsyncWriteExt, DuplexStream};

async fn conn(script: ServerScript, mode: BatchMode) -> (Conn<DuplexStream>, DuplexStream) {
    let (client, mut server) = tokio::io::duplex(1 << 16);
    server.write_all(&script.into_bytes()).await.unwrap();
    let opts = Opts {
        batch_mode: mode,
        ..Default::default()
    };
    (Conn::new_with_stream(client, opts), server)
}

fn scenario_batch() -> Batch {
    let mut batch = Batch::new();
    batch.queue("INSERT INTO t VALUES (1)", ());
    batch.queue("SELECT x FROM t", ());
    batch.queue("UPDATE t SET x=2", ());
    batch
}

#[tokio::test]
async fn pipeline_scenario() {
    let script = ServerScript::new()
        .command("INSERT 0 1")
        .ready_idle()
        .select_ints(&[1])
        .ready_idle()
        .command("UPDATE 1")
        .ready_idle();
    let (mut conn, _server) = conn(script, BatchMode::Pipeline).await;
    let recorder = Recorder::new();
    conn.set_batch_tracer(Some(recorder.clone()));
    {
        let mut results = conn.send_batch(scenario_batch()).await.unwrap();
        assert_eq!(results.exec().await.unwrap().as_str(), "INSERT 0 1");
        let mut rows = results.query().await.unwrap();
        let xs: Vec<(i32,)> = rows.collect().await.unwrap();
        assert_eq!(xs, vec![(1,)]);
        drop(rows);
        assert_eq!(results.exec().await.unwrap().as_str(), "UPDATE 1");
        assert!(results.close().await.is_ok());
        assert!(results.close().await.is_ok());
    }
    assert!(!conn.is_broken());
    assert_eq!(recorder.query_count(), 3);
    assert_eq!(recorder.end_count(), 1);
}

#[tokio::test]
async fn simple_error_aborts_the_batch() {
    let script = ServerScript::new()
        .command("INSERT 0 1")
        .parse_complete()
        .error("42P01", "relation \"t\" does not exist")
        .ready_idle();
    let (mut conn, _server) = conn(script, BatchMode::Simple).await;
    {
        let mut results = conn.send_batch(scenario_batch()).await.unwrap();
        assert!(results.exec().await.is_ok());
        let err = results.query_row().await.scan::<(i32,)>().await.unwrap_err();
        assert_eq!(err.sqlstate(), Some("42P01"));
        assert_eq!(results.exec().await.unwrap_err().sqlstate(), Some("42P01"));
        assert_eq!(results.close().await.unwrap_err().sqlstate(), Some("42P01"));
    }
    assert!(!conn.is_broken());
}

#[tokio::test]
async fn pipeline_continues_after_failed_statement_on_close() {
    let script = ServerScript::new()
        .parse_complete()
        .error("22012", "division by zero")
        .ready_idle()
        .command("INSERT 0 1")
        .ready_idle();
    let (mut conn, _server) = conn(script, BatchMode::Pipeline).await;
    let recorder = Recorder::new();
    conn.set_batch_tracer(Some(recorder.clone()));
    {
        let mut batch = Batch::new();
        batch.queue("SELECT 1/0", ());
        batch.queue("INSERT INTO t VALUES (1)", ());
        let mut results = conn.send_batch(batch).await.unwrap();
        assert_eq!(results.close().await.unwrap_err().sqlstate(), Some("22012"));
    }
    assert!(!conn.is_broken());
    let events = recorder.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], Event::Query { err: Some(_), .. }));
    assert!(matches!(&events[1], Event::Query { err: Some(_), .. }));
    assert!(matches!(&events[2], Event::End { err: Some(_) }));
}

#[tokio::test]
async fn dropped_row_stream_is_skipped() {
    let script = ServerScript::new()
        .select_ints(&[1, 2, 3])
        .ready_idle()
        .command("INSERT 0 1")
        .ready_idle();
    let (mut conn, _server) = conn(script, BatchMode::Pipeline).await;
    let recorder = Recorder::new();
    conn.set_batch_tracer(Some(recorder.clone()));
    {
        let mut batch = Batch::new();
        batch.queue("SELECT x FROM t", ());
        batch.queue("INSERT INTO t VALUES (4)", ());
        let mut results = conn.send_batch(batch).await.unwrap();
        let mut rows = results.query().await.unwrap();
        assert!(rows.next_row().await.unwrap().is_some());
        drop(rows);
        assert_eq!(results.exec().await.unwrap().as_str(), "INSERT 0 1");
        assert!(results.close().await.is_ok());
    }
    assert!(!conn.is_broken());
    let events = recorder.events();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        Event::Query {
            sql: "SELECT x FROM t".into(),
            tag: Some("SELECT 3".into()),
            err: None,
        }
    );
    assert!(matches!(&events[1], Event::Query { err: None, .. }));
    assert_eq!(events[2], Event::End { err: None });
}

fn failing_select(script: ServerScript) -> ServerScript {
    script
        .parse_complete()
        .bind_complete()
        .describe_ints(&["x"])
        .row_ints(&[1])
        .row_ints(&[2])
        .error("22012", "division by zero")
}

#[tokio::test]
async fn dropped_row_stream_is_traced_with_its_error() {
    let script = failing_select(ServerScript::new())
        .ready_idle()
        .command("INSERT 0 1")
        .ready_idle();
    let (mut conn, _server) = conn(script, BatchMode::Pipeline).await;
    let recorder = Recorder::new();
    conn.set_batch_tracer(Some(recorder.clone()));
    let err = {
        let mut batch = Batch::new();
        batch.queue("SELECT 1/(2-x) FROM t", ());
        batch.queue("INSERT INTO t VALUES (1)", ());
        let mut results = conn.send_batch(batch).await.unwrap();
        let mut rows = results.query().await.unwrap();
        assert!(rows.next_row().await.unwrap().is_some());
        drop(rows);
        let err = results.exec().await.unwrap_err();
        assert_eq!(err.sqlstate(), Some("22012"));
        assert_eq!(results.close().await.unwrap_err().sqlstate(), Some("22012"));
        err.to_string()
    };
    assert!(!conn.is_broken());
    assert_eq!(
        recorder.events(),
        vec![
            Event::Query {
                sql: "SELECT 1/(2-x) FROM t".into(),
                tag: None,
                err: Some(err.clone()),
            },
            Event::Query {
                sql: "INSERT INTO t VALUES (1)".into(),
                tag: None,
                err: Some(err.clone()),
            },
            Event::End { err: Some(err) },
        ]
    );
}

#[tokio::test]
async fn simple_dropped_row_stream_is_traced_with_its_error() {
    let script = failing_select(ServerScript::new()).ready_idle();
    let (mut conn, _server) = conn(script, BatchMode::Simple).await;
    let recorder = Recorder::new();
    conn.set_batch_tracer(Some(recorder.clone()));
    {
        let mut batch = Batch::new();
        batch.queue("SELECT 1/(2-x) FROM t", ());
        batch.queue("INSERT INTO t VALUES (1)", ());
        let mut results = conn.send_batch(batch).await.unwrap();
        assert!(matches!(results, pgbatch::tokio::BatchResults::Simple(_)));
        let mut rows = results.query().await.unwrap();
        assert!(rows.next_row().await.unwrap().is_some());
        drop(rows);
        assert_eq!(results.exec().await.unwrap_err().sqlstate(), Some("22012"));
        assert_eq!(results.close().await.unwrap_err().sqlstate(), Some("22012"));
    }
    assert!(!conn.is_broken());
    let events = recorder.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], Event::Query { sql, err: Some(_), .. } if sql.starts_with("SELECT")));
    assert!(matches!(&events[1], Event::Query { sql, err: Some(_), .. } if sql.starts_with("INSERT")));
    assert!(matches!(&events[2], Event::End { err: Some(_) }));
}

#[tokio::test]
async fn erred_row_stream_short_circuits_next_request() {
    let script = ServerScript::new()
        .parse_complete()
        .bind_complete()
        .describe_ints(&["x"])
        .row_ints(&[1])
        .error("22012", "division by zero")
        .ready_idle();
    let (mut conn, mut server) = conn(script, BatchMode::Pipeline).await;
    {
        let mut batch = Batch::new();
        batch.queue("SELECT 1/(1-x) FROM t", ());
        batch.queue("INSERT INTO t VALUES (1)", ());
        let mut results = conn.send_batch(batch).await.unwrap();
        assert!(matches!(results, pgbatch::tokio::BatchResults::Pipelined(_)));
        let mut rows = results.query().await.unwrap();
        assert!(rows.next_row().await.unwrap().is_some());
        assert_eq!(rows.next_row().await.unwrap_err().sqlstate(), Some("22012"));
        drop(rows);

        // the INSERT response has not been sent yet, so any read would wait
        let err = tokio::select! {
            biased;
            result = results.exec() => result.unwrap_err(),
            () = std::future::ready(()) => panic!("exec read from the connection"),
        };
        assert_eq!(err.sqlstate(), Some("22012"));

        let rest = ServerScript::new().command("INSERT 0 1").ready_idle();
        server.write_all(&rest.into_bytes()).await.unwrap();
        assert_eq!(results.close().await.unwrap_err().sqlstate(), Some("22012"));
    }
    assert!(!conn.is_broken());
}

#[tokio::test]
async fn copy_result_breaks_the_connection() {
    let script = ServerScript::new()
        .parse_complete()
        .bind_complete()
        .copy_in();
    let (mut conn, _server) = conn(script, BatchMode::Pipeline).await;
    {
        let mut batch = Batch::new();
        batch.queue("COPY t FROM STDIN", ());
        let mut results = conn.send_batch(batch).await.unwrap();
        assert!(matches!(
            results.exec().await,
            Err(Error::UnexpectedPipelineResult("CopyIn"))
        ));
        assert!(matches!(
            results.close().await,
            Err(Error::UnexpectedPipelineResult("CopyIn"))
        ));
    }
    assert!(conn.is_broken());
    assert!(matches!(
        conn.send_batch(Batch::new()).await,
        Err(Error::ConnectionBroken)
    ));
}

#[tokio::test]
async fn dropped_results_break_the_connection() {
    let script = ServerScript::new()
        .command("INSERT 0 1")
        .ready_idle()
        .command("INSERT 0 1")
        .ready_idle();
    let (mut conn, _server) = conn(script, BatchMode::Pipeline).await;
    let recorder = Recorder::new();
    conn.set_batch_tracer(Some(recorder.clone()));
    {
        let mut batch = Batch::new();
        batch.queue("INSERT INTO t VALUES (1)", ());
        batch.queue("INSERT INTO t VALUES (2)", ());
        let mut results = conn.send_batch(batch).await.unwrap();
        assert!(results.exec().await.is_ok());
    }
    assert!(conn.is_broken());
    assert!(matches!(
        conn.send_batch(Batch::new()).await,
        Err(Error::ConnectionBroken)
    ));

    let events = recorder.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], Event::Query { err: None, .. }));
    let broken = Error::ConnectionBroken.to_string();
    assert_eq!(
        events[1],
        Event::Query {
            sql: "INSERT INTO t VALUES (2)".into(),
            tag: None,
            err: Some(broken.clone()),
        }
    );
    assert_eq!(events[2], Event::End { err: Some(broken) });
}

#[tokio::test]
async fn eof_breaks_the_connection() {
    let script = ServerScript::new().command("INSERT 0 1");
    let (mut conn, server) = conn(script, BatchMode::Pipeline).await;
    {
        let mut batch = Batch::new();
        batch.queue("INSERT INTO t VALUES (1)", ());
        let mut results = conn.send_batch(batch).await.unwrap();
        drop(server);
        assert!(results.exec().await.is_ok());
        assert!(matches!(results.close().await, Err(Error::Io(_))));
    }
    assert!(conn.is_broken());
}
