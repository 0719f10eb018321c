use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use super::*;

/// File-backed handle whose close goes through `io::Error`.
#[derive(Default)]
struct Spool {
	flushed: AtomicBool,
	broken: bool,
}

impl Spool {
	fn flush(&self) -> io::Result<()> {
		if self.broken {
			return Err(io::Error::new(io::ErrorKind::BrokenPipe, "spool disk detached"));
		}
		self.flushed.store(true, Ordering::SeqCst);
		Ok(())
	}
}

impl Closeable for Spool {
	fn close(&self) -> Result<(), CloseError> {
		self.flush()?;
		Ok(())
	}
}

struct Idle;

#[async_trait]
impl Service for Idle {
	fn stop_async(&self) {}

	async fn await_terminated(&self) -> Result<(), CloseError> {
		Ok(())
	}
}

#[test]
fn capability_follows_constructor() {
	assert_eq!(Resource::inert(7_u32).capability(), Capability::Inert);
	assert_eq!(Resource::closeable(Spool::default()).capability(), Capability::Closeable);
	assert_eq!(Resource::service(Idle).capability(), Capability::Service);
}

#[test]
fn cached_value_keeps_identity_and_type() {
	let resource = Resource::closeable(Spool::default());
	let value = Arc::clone(resource.value());
	let cached = resource.into_cached();

	let restored = cached.downcast::<Spool>().unwrap();
	assert!(Arc::ptr_eq(&value, &restored));
	assert!(cached.downcast::<String>().is_none());

	let Lifecycle::Closeable(closer) = &cached.lifecycle else {
		panic!("expected a closeable lifecycle");
	};
	closer.close().unwrap();
	assert!(value.flushed.load(Ordering::SeqCst));
}

#[test]
fn io_failures_convert_on_close() {
	let spool = Spool {
		broken: true,
		..Spool::default()
	};

	let err = spool.close().unwrap_err();
	assert!(matches!(err, CloseError::Io(ref io) if io.kind() == io::ErrorKind::BrokenPipe));
	assert_eq!(err.to_string(), "I/O error while closing: spool disk detached");
	assert!(!spool.flushed.load(Ordering::SeqCst));
}
