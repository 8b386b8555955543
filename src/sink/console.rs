use std::io::Write as _;
use std::thread;
use std::time::Duration;

use crossterm::{
    cursor, execute,
    style::{Print, ResetColor, SetForegroundColor},
    terminal,
};

use super::{AudioSink, SAMPLE_RATE_PROBE_ORDER};
use crate::error::CwResult;
use crate::tone::Tone;

/// Textual stand-in for unixcw's PC-speaker console backend: toggles a
/// visible on/off indicator for the duration of each tone instead of
/// driving real square-wave hardware, which isn't something a portable
/// crate can reach for. Grounded on the teacher's `crossterm`-driven
/// interactive mode.
#[derive(Default)]
pub struct ConsoleSink {
    sample_rate: u32,
}

impl AudioSink for ConsoleSink {
    fn open(&mut self, probe_rates: &[u32]) -> CwResult<u32> {
        self.sample_rate = probe_rates
            .first()
            .copied()
            .unwrap_or(SAMPLE_RATE_PROBE_ORDER[0]);
        Ok(self.sample_rate)
    }

    fn write(&mut self, _samples: &[i16]) -> CwResult<()> {
        Ok(())
    }

    fn silence(&mut self) -> CwResult<()> {
        let mut stdout = std::io::stdout();
        let _ = execute!(stdout, ResetColor, Print(" "));
        let _ = stdout.flush();
        Ok(())
    }

    fn renders_directly(&self) -> bool {
        true
    }

    fn render_tone_directly(&mut self, tone: Tone) -> CwResult<()> {
        let mut stdout = std::io::stdout();
        if tone.frequency_hz > 0 {
            let _ = execute!(
                stdout,
                SetForegroundColor(crossterm::style::Color::Green),
                Print("█"),
                cursor::MoveLeft(1),
            );
        } else {
            let _ = execute!(stdout, Print(" "), cursor::MoveLeft(1));
        }
        let _ = stdout.flush();
        thread::sleep(Duration::from_micros(tone.duration_us));
        Ok(())
    }

    fn close(&mut self) -> CwResult<()> {
        let _ = execute!(std::io::stdout(), ResetColor, terminal::Clear(terminal::ClearType::CurrentLine));
        Ok(())
    }
}
