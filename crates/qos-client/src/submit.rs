// SPDX-License-Identifier: Apache-2.0
//! Circuit submission.
//!
//! Wire format of a submission (one `write(2)` on the device):
//!
//! ```text
//!   shots=1000 priority=0 mitigation=0 alloc_strategy=0 split_strategy=0\n
//!   OPENQASM 2.0;
//!   ...
//! ```
//!
//! There is no length prefix: the header ends at the first `\n` and the
//! payload runs to the end of the write. The whole buffer must be shorter
//! than [`ffi::QOS_QIR_SIZE`]. The kernel answers with a single native-endian
//! `int`, the assigned qid.

use std::mem::size_of;
use std::os::raw::c_int;

use crate::error::{QosError, QosResult};
use crate::ffi;
use crate::session::{Channel, Connector};
use crate::task::{SubmissionConfig, TaskHandle};

/// Render the configuration header line, including its trailing newline.
pub fn encode_header(config: &SubmissionConfig) -> String {
    format!(
        "shots={} priority={} mitigation={} alloc_strategy={} split_strategy={}\n",
        config.shots,
        config.priority,
        config.error_mitigation.wire_value(),
        config.alloc_strategy.wire_value(),
        config.split_strategy.wire_value(),
    )
}

/// Build the full submission buffer, validating it against the protocol
/// limits. No I/O happens here.
pub fn encode_submission(circuit: &str, config: &SubmissionConfig) -> QosResult<Vec<u8>> {
    if circuit.is_empty() {
        return Err(QosError::InvalidArgument("circuit is empty".into()));
    }
    if config.shots == 0 {
        return Err(QosError::InvalidArgument("shots must be at least 1".into()));
    }

    let header = encode_header(config);
    let total = header.len() + circuit.len();
    if total >= ffi::QOS_QIR_SIZE {
        return Err(QosError::InvalidArgument(format!(
            "encoded submission is {total} bytes, limit is {}",
            ffi::QOS_QIR_SIZE - 1
        )));
    }

    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(circuit.as_bytes());
    Ok(buf)
}

/// Submit a circuit and return the scheduler-assigned handle.
///
/// Exactly one write and one read on a fresh session. Nothing is retried.
pub fn submit<C: Connector>(
    connector: &C,
    circuit: &str,
    config: &SubmissionConfig,
) -> QosResult<TaskHandle> {
    let buf = encode_submission(circuit, config)?;

    let mut channel = connector.open()?;

    let written = channel
        .write(&buf)
        .map_err(|e| QosError::SubmitFailed(format!("write failed: {e}")))?;
    if written != buf.len() {
        return Err(QosError::SubmitFailed(format!(
            "short write: {written} of {} bytes",
            buf.len()
        )));
    }

    let mut reply = [0u8; size_of::<c_int>()];
    let read = channel
        .read(&mut reply)
        .map_err(|e| QosError::SubmitFailed(format!("failed to read qid: {e}")))?;
    if read != reply.len() {
        return Err(QosError::SubmitFailed(format!(
            "short reply: {read} of {} bytes",
            reply.len()
        )));
    }

    let raw = c_int::from_ne_bytes(reply);
    let qid = TaskHandle::new(raw)
        .map_err(|_| QosError::SubmitFailed(format!("scheduler returned qid {raw}")))?;

    tracing::info!(
        "submitted task {} ({} bytes, shots={}, priority={})",
        qid,
        buf.len(),
        config.shots,
        config.priority
    );
    Ok(qid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{AllocStrategy, ErrorMitigation, SplitStrategy};

    const BELL: &str = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0],q[1];\nmeasure q -> c;\n";

    #[test]
    fn test_header_contains_all_fields() {
        let config = SubmissionConfig::default()
            .with_shots(2000)
            .with_priority(3)
            .with_error_mitigation(ErrorMitigation::Cdr)
            .with_alloc_strategy(AllocStrategy::Fidelity)
            .with_split_strategy(SplitStrategy::Time);

        let buf = encode_submission(BELL, &config).unwrap();
        let text = std::str::from_utf8(&buf).unwrap();
        let (header, payload) = text.split_once('\n').unwrap();

        assert_eq!(
            header,
            "shots=2000 priority=3 mitigation=2 alloc_strategy=1 split_strategy=2"
        );
        assert_eq!(payload, BELL);
        assert!(buf.len() < ffi::QOS_QIR_SIZE);
    }

    #[test]
    fn test_default_header() {
        assert_eq!(
            encode_header(&SubmissionConfig::default()),
            "shots=1000 priority=0 mitigation=0 alloc_strategy=0 split_strategy=0\n"
        );
    }

    #[test]
    fn test_negative_priority_rendered() {
        let header = encode_header(&SubmissionConfig::default().with_priority(-2));
        assert!(header.contains(" priority=-2 "));
    }

    #[test]
    fn test_empty_circuit_rejected() {
        assert!(matches!(
            encode_submission("", &SubmissionConfig::default()),
            Err(QosError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_shots_rejected() {
        assert!(matches!(
            encode_submission(BELL, &SubmissionConfig::default().with_shots(0)),
            Err(QosError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_size_limit_is_exclusive() {
        let config = SubmissionConfig::default();
        let header_len = encode_header(&config).len();

        let fits = "x".repeat(ffi::QOS_QIR_SIZE - 1 - header_len);
        assert_eq!(
            encode_submission(&fits, &config).unwrap().len(),
            ffi::QOS_QIR_SIZE - 1
        );

        let too_big = "x".repeat(ffi::QOS_QIR_SIZE - header_len);
        assert!(matches!(
            encode_submission(&too_big, &config),
            Err(QosError::InvalidArgument(_))
        ));
    }
}
