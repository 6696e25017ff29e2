//! Configured setup of the process-wide buffer. Kept in its own test binary
//! so nothing touches the global instance before `install_global` runs.

use trace_buffer::utils::config::BufferConfig;
use trace_buffer::{install_global, EngineError, EventBuffer, EventRecord};

#[test]
fn install_then_global_share_one_instance() {
    let installed = install_global(&BufferConfig { capacity: 3 }).unwrap();
    assert_eq!(installed.capacity(), 3);
    assert!(std::ptr::eq(installed, EventBuffer::global()));

    for i in 0..4 {
        let _ = EventBuffer::global().enqueue(EventRecord::new("svc", format!("r{}", i)));
    }
    assert_eq!(installed.accepted_count(), 3);
    assert_eq!(installed.rejected_count(), 1);

    let titles: Vec<String> = installed
        .drain_all()
        .iter()
        .map(|r| r.title().to_string())
        .collect();
    assert_eq!(titles, vec!["r0", "r1", "r2"]);

    assert!(matches!(
        install_global(&BufferConfig { capacity: 10 }),
        Err(EngineError::AlreadyInitialized)
    ));
}
