//! Magnitude spectrum backends
//!
//! Both backends fill `out[k]` with `sqrt(re² + im²)` for every bin `k` inside
//! the band and leave every other entry at zero.

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::framer::BinRange;

/// Which [`SpectrumBackend`] the framer builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectrumBackendKind {
    /// Direct summation over the band bins only
    #[default]
    DirectDft,
    /// Full-size FFT from `rustfft`, band extracted afterwards
    RustFft,
}

impl SpectrumBackendKind {
    /// Build a backend for windows of `frame_size` samples and the given bins
    pub fn build(self, frame_size: usize, bins: BinRange) -> Box<dyn SpectrumBackend> {
        match self {
            SpectrumBackendKind::DirectDft => Box::new(DirectDft::new(frame_size, bins)),
            SpectrumBackendKind::RustFft => Box::new(RustFftBackend::new(frame_size, bins)),
        }
    }
}

/// Computes band-limited magnitude spectra of tapered windows
pub trait SpectrumBackend: Send {
    /// Write band magnitudes of `tapered` into `out`
    ///
    /// `tapered.len()` equals the frame size the backend was built for and
    /// `out.len()` equals `bins.last + 1`.
    fn magnitudes(&mut self, tapered: &[f32], out: &mut [f32]);

    /// Get the name of this backend (for logging)
    fn name(&self) -> &'static str;
}

/// Direct DFT restricted to a bin range
///
/// Cost is `O(N · bins)` per window. The twiddle tables are built once per
/// backend; for narrow bands this beats a full FFT.
#[derive(Debug, Clone)]
pub struct DirectDft {
    frame_size: usize,
    bins: BinRange,
    /// `cos(2πkn/N)` for each band bin, row-major by bin
    cos_table: Vec<f32>,
    /// `sin(2πkn/N)` for each band bin, row-major by bin
    sin_table: Vec<f32>,
}

impl DirectDft {
    /// Precompute twiddles for `bins` at `frame_size`
    pub fn new(frame_size: usize, bins: BinRange) -> Self {
        let n_bins = bins.count();
        let mut cos_table = Vec::with_capacity(n_bins * frame_size);
        let mut sin_table = Vec::with_capacity(n_bins * frame_size);

        for k in bins.first..=bins.last {
            for n in 0..frame_size {
                // Reduce k·n modulo N before scaling so large products keep precision
                let phase = 2.0 * PI * ((k * n) % frame_size) as f64 / frame_size as f64;
                cos_table.push(phase.cos() as f32);
                sin_table.push(phase.sin() as f32);
            }
        }

        Self {
            frame_size,
            bins,
            cos_table,
            sin_table,
        }
    }
}

impl SpectrumBackend for DirectDft {
    fn magnitudes(&mut self, tapered: &[f32], out: &mut [f32]) {
        debug_assert_eq!(tapered.len(), self.frame_size);
        out.fill(0.0);

        for (row, k) in (self.bins.first..=self.bins.last).enumerate() {
            let start = row * self.frame_size;
            let cos_row = &self.cos_table[start..start + self.frame_size];
            let sin_row = &self.sin_table[start..start + self.frame_size];

            let mut real = 0.0f32;
            let mut imag = 0.0f32;
            for ((x, c), s) in tapered.iter().zip(cos_row).zip(sin_row) {
                real += x * c;
                imag += x * s;
            }
            out[k] = (real * real + imag * imag).sqrt();
        }
    }

    fn name(&self) -> &'static str {
        "direct-dft"
    }
}

/// Full FFT backend using `rustfft`
pub struct RustFftBackend {
    bins: BinRange,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RustFftBackend {
    /// Plan a forward FFT of `frame_size` points
    pub fn new(frame_size: usize, bins: BinRange) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            bins,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); frame_size],
            scratch,
        }
    }
}

impl SpectrumBackend for RustFftBackend {
    fn magnitudes(&mut self, tapered: &[f32], out: &mut [f32]) {
        debug_assert_eq!(tapered.len(), self.buffer.len());
        for (slot, &x) in self.buffer.iter_mut().zip(tapered) {
            *slot = Complex::new(x, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        out.fill(0.0);
        for k in self.bins.first..=self.bins.last {
            out[k] = self.buffer[k].norm();
        }
    }

    fn name(&self) -> &'static str {
        "rustfft"
    }
}
