use gmmk_rgb_core::{Transport, TransportError};

use crate::consts::PACKET_SIZE;

/// Transport that records every report and can be told to fail
#[derive(Debug, Default)]
pub struct Recorder {
    pub reports: Vec<(u8, Vec<u8>)>,
    /// Zero based index of the write attempt that fails
    pub fail_at: Option<usize>,
    attempts: usize,
}

impl Recorder {
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Default::default()
        }
    }

    /// Reassembled reports including the report id
    pub fn packets(&self) -> Vec<[u8; PACKET_SIZE]> {
        self.reports
            .iter()
            .map(|(id, payload)| {
                let mut buf = [0u8; PACKET_SIZE];
                buf[0] = *id;
                buf[1..].copy_from_slice(payload);
                buf
            })
            .collect()
    }

    /// Command byte of each recorded report
    pub fn commands(&self) -> Vec<u8> {
        self.reports.iter().map(|(_, payload)| payload[2]).collect()
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }
}

impl Transport for Recorder {
    fn send_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_at == Some(attempt) {
            return Err(TransportError::Closed);
        }
        self.reports.push((report_id, payload.to_vec()));
        Ok(())
    }
}
