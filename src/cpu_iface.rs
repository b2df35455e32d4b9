// CPU and sound-chip interface contracts
//
// The 68000/Z80 interpreters and the FM/PSG oscillators are external
// collaborators (see scope notes). This module specifies only the contracts
// the frame scheduler and audio mixer drive them through.

/// A cycle-budget-driven CPU stepper.
///
/// Implementors run instructions until their internal cycle counter reaches
/// or exceeds `target`, then return. They may also return early to honor an
/// IRQ edge or a DMA stall; the scheduler re-invokes `run_until` with the
/// same target in that case.
pub trait CpuStepper {
    /// Run until `cycles_executed() >= target`, or until a suspension point
    /// is hit (IRQ edge, DMA stall). Returns the cycle count actually
    /// reached.
    fn run_until(&mut self, target: u64) -> u64;

    /// Total cycles executed since the last reset.
    fn cycles_executed(&self) -> u64;

    /// Assert an interrupt at the given priority level (68k-style 0..=7,
    /// Z80 callers use 0/1 for "line clear"/"line asserted").
    fn assert_irq(&mut self, level: u8);

    /// Clear a previously asserted interrupt line.
    fn clear_irq(&mut self);

    /// Reset the CPU's cycle counter and internal state.
    fn reset(&mut self);
}

/// A stereo sample produced by an FM or PSG sound chip.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoSample {
    pub left: i32,
    pub right: i32,
}

/// FM/PSG sample-generation contract consumed by the audio mixer (C5).
///
/// `SoundChip` implementors are oscillator banks; this crate never emulates
/// their internals, only calls them for batches of samples once per frame.
pub trait SoundChip {
    /// Produce `count` stereo samples at the chip's native output rate.
    fn generate(&mut self, count: usize, out: &mut [StereoSample]);
}

/// PSG sample-generation contract (mono, int16) consumed by the audio
/// mixer (C5). Separate from `SoundChip` because the PSG path is always
/// produced at the mixer's target `size`, never resampled.
pub trait PsgChip {
    /// Produce `count` mono samples at the mixer's target sample count.
    fn generate(&mut self, count: usize, out: &mut [i16]);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingCpu {
        cycles: u64,
    }

    impl CpuStepper for CountingCpu {
        fn run_until(&mut self, target: u64) -> u64 {
            self.cycles = target;
            self.cycles
        }

        fn cycles_executed(&self) -> u64 {
            self.cycles
        }

        fn assert_irq(&mut self, _level: u8) {}
        fn clear_irq(&mut self) {}
        fn reset(&mut self) {
            self.cycles = 0;
        }
    }

    #[test]
    fn test_cpu_stepper_contract() {
        let mut cpu = CountingCpu { cycles: 0 };
        assert_eq!(cpu.run_until(100), 100);
        assert_eq!(cpu.cycles_executed(), 100);
        cpu.reset();
        assert_eq!(cpu.cycles_executed(), 0);
    }

    struct SilentPsg;
    impl PsgChip for SilentPsg {
        fn generate(&mut self, count: usize, out: &mut [i16]) {
            for sample in out.iter_mut().take(count) {
                *sample = 0;
            }
        }
    }

    #[test]
    fn test_psg_chip_contract() {
        let mut psg = SilentPsg;
        let mut buf = [1i16; 4];
        psg.generate(4, &mut buf);
        assert_eq!(buf, [0, 0, 0, 0]);
    }
}
