//! The report transport boundary.

use hidapi::HidDevice;

use crate::TransportError;

/// Sends fixed-size output reports to an open device.
///
/// One call is exactly one physical write. Returning means the channel took
/// the report, not that the device acted on it.
pub trait Transport {
    fn send_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError>;
}

impl Transport for HidDevice {
    fn send_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        // hidapi expects the report id as the first byte of the buffer
        let mut buf = Vec::with_capacity(payload.len() + 1);
        buf.push(report_id);
        buf.extend_from_slice(payload);
        let written = self.write(&buf)?;
        if written < buf.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: buf.len(),
            });
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        (**self).send_report(report_id, payload)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        (**self).send_report(report_id, payload)
    }
}
