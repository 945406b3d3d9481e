//! Core sample types shared across the workspace.

use rustfft::num_complex::Complex64;

use crate::error::AnalysisError;

/// Complex sample type: I on the real axis, Q on the imaginary axis.
pub type IQSample = Complex64;

/// Payload of one capture.
///
/// Direct-sampled captures are real-valued; mixer captures carry complex
/// I/Q pairs. Analysis routines accept either and lift real data into the
/// complex plane where the math requires it.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    /// Real samples from the direct-sampled ADC path.
    Real(Vec<f64>),
    /// Complex baseband samples from the mixer path.
    Iq(Vec<IQSample>),
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::Real(v) => v.len(),
            SampleBuffer::Iq(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for mixer (complex) captures.
    pub fn is_complex(&self) -> bool {
        matches!(self, SampleBuffer::Iq(_))
    }

    /// View of the real payload, if this is a direct-sampled buffer.
    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            SampleBuffer::Real(v) => Some(v),
            SampleBuffer::Iq(_) => None,
        }
    }

    /// View of the complex payload, if this is a mixer buffer.
    pub fn as_iq(&self) -> Option<&[IQSample]> {
        match self {
            SampleBuffer::Real(_) => None,
            SampleBuffer::Iq(v) => Some(v),
        }
    }

    /// Lift into the complex plane. Real samples get a zero imaginary
    /// part; complex samples are copied as-is.
    pub fn to_complex(&self) -> Vec<IQSample> {
        match self {
            SampleBuffer::Real(v) => v.iter().map(|&x| IQSample::new(x, 0.0)).collect(),
            SampleBuffer::Iq(v) => v.clone(),
        }
    }

    /// Pair up a two-rail real layout (in-phase, quadrature) into complex
    /// samples. Back ends that report I and Q as separate columns go
    /// through here; mismatched rail lengths are rejected.
    pub fn from_iq_rails(i: &[f64], q: &[f64]) -> Result<Self, AnalysisError> {
        if i.len() != q.len() {
            return Err(AnalysisError::ShapeMismatch {
                expected: i.len(),
                actual: q.len(),
            });
        }
        Ok(SampleBuffer::Iq(
            i.iter()
                .zip(q)
                .map(|(&re, &im)| IQSample::new(re, im))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_buffer_basics() {
        let buf = SampleBuffer::Real(vec![1.0, -1.0, 0.5]);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_complex());
        assert_eq!(buf.as_real(), Some(&[1.0, -1.0, 0.5][..]));
        let complex = buf.to_complex();
        assert_eq!(complex[0], IQSample::new(1.0, 0.0));
        assert_eq!(complex[1], IQSample::new(-1.0, 0.0));
    }

    #[test]
    fn test_iq_pairing() {
        let buf = SampleBuffer::from_iq_rails(&[1.0, 2.0], &[3.0, 4.0]).unwrap();
        assert!(buf.is_complex());
        assert_eq!(
            buf.as_iq().unwrap(),
            &[IQSample::new(1.0, 3.0), IQSample::new(2.0, 4.0)]
        );
    }

    #[test]
    fn test_iq_pairing_rejects_ragged_rails() {
        let err = SampleBuffer::from_iq_rails(&[1.0, 2.0], &[3.0]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::ShapeMismatch {
                expected: 2,
                actual: 1
            }
        );
    }
}
