mod common;

use bridge_ts::ContextOptions;
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
  buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
  fn contents(&self) -> String {
    String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap()
  }
}

struct SharedWriterGuard<'a> {
  buffer: &'a Arc<Mutex<Vec<u8>>>,
}

impl<'a> io::Write for SharedWriterGuard<'a> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.buffer.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for SharedWriter {
  type Writer = SharedWriterGuard<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    SharedWriterGuard {
      buffer: &self.buffer,
    }
  }
}

fn capture(level: tracing::Level, f: impl FnOnce()) -> String {
  let writer = SharedWriter::default();
  let subscriber = tracing_subscriber::fmt()
    .with_span_events(FmtSpan::CLOSE)
    .with_max_level(level)
    .with_ansi(false)
    .with_writer(writer.clone())
    .finish();
  let guard = tracing::subscriber::set_default(subscriber);
  f();
  drop(guard);
  writer.contents()
}

#[test]
fn dropping_an_open_context_warns_and_releases() {
  let output = capture(tracing::Level::WARN, || {
    let runtime = common::runtime();
    runtime.with(|ctx| {
      let cx = common::open(ctx, &[("main.ts", "let x = 1;")], ContextOptions::default()).unwrap();
      let file = common::first_file(&cx);
      drop(cx);
      assert!(file.pos().is_err());
    });
  });
  assert!(
    output.contains("program context dropped without close"),
    "expected a teardown warning, got: {output}"
  );
}

#[test]
fn explicit_close_logs_released_counts() {
  let output = capture(tracing::Level::DEBUG, || {
    common::with_program(&[("main.ts", "let x = 1;")], |cx| {
      common::first_file(cx);
      cx.close().unwrap();
    });
  });
  assert!(
    output.contains("close_program_context"),
    "expected the teardown span, got: {output}"
  );
  assert!(output.contains("released program context"), "{output}");
  assert!(output.contains("nodes=1"), "{output}");
  assert!(!output.contains("dropped without close"), "{output}");
}
