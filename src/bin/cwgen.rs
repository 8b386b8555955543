use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::event::{self, Event, KeyCode};
use std::io::Read;

use cwgen::{alphabet, AudioSink, ConsoleSink, ControlPlane, NullSink, RodioSink, ToneShape, WavSink};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Speed in WPM (PARIS standard)
    #[arg(short, long, default_value_t = 20)]
    wpm: u32,

    /// Tone frequency in Hz
    #[arg(short, long, default_value_t = 600)]
    tone: u32,

    /// Volume as a percentage
    #[arg(long, default_value_t = 70)]
    volume: u32,

    /// Extra inter-character gap, in dot units
    #[arg(short, long, default_value_t = 0)]
    gap: u32,

    /// Dot/dash weighting, 20-80 (50 = unweighted)
    #[arg(long, default_value_t = 50)]
    weighting: u32,

    /// Output backend
    #[arg(long, value_enum, default_value_t = OutputBackend::Audio)]
    output: OutputBackend,

    /// Envelope shape applied to tone attack/release
    #[arg(long, value_enum, default_value_t = ToneShapeArg::RaisedCosine)]
    tone_shape: ToneShapeArg,

    /// Envelope length in microseconds (ignored for rectangular)
    #[arg(long, default_value_t = 5_000)]
    slope_len_us: u32,

    /// Save audio to this WAV file instead of playing it live
    #[arg(long)]
    output_file: Option<String>,

    /// Read text from file instead of stdin
    #[arg(short, long)]
    file: Option<String>,

    /// Interactive typing mode: each keystroke is sent immediately, Esc quits
    #[arg(short, long)]
    interactive: bool,

    /// Drive the generator from a straight key in interactive mode instead
    /// of translating keystrokes to text
    #[arg(long, requires = "interactive")]
    straight_key: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputBackend {
    Audio,
    Console,
    Null,
    Text,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ToneShapeArg {
    Linear,
    RaisedCosine,
    Sine,
    Rectangular,
}

impl From<ToneShapeArg> for ToneShape {
    fn from(v: ToneShapeArg) -> Self {
        match v {
            ToneShapeArg::Linear => ToneShape::Linear,
            ToneShapeArg::RaisedCosine => ToneShape::RaisedCosine,
            ToneShapeArg::Sine => ToneShape::Sine,
            ToneShapeArg::Rectangular => ToneShape::Rectangular,
        }
    }
}

fn build_sink(args: &Args) -> Result<Box<dyn AudioSink>> {
    if let Some(path) = &args.output_file {
        return Ok(Box::new(WavSink::new(path.clone())));
    }
    Ok(match args.output {
        OutputBackend::Audio => Box::new(RodioSink::new()),
        OutputBackend::Console => Box::new(ConsoleSink::default()),
        OutputBackend::Null | OutputBackend::Text => Box::new(NullSink::default()),
    })
}

fn print_morse(text: &str) -> Result<()> {
    let mut words = Vec::new();
    for word in text.split_whitespace() {
        let mut letters = Vec::new();
        for c in word.chars() {
            let rep = alphabet::representation(c)
                .with_context(|| format!("no morse mapping for '{c}'"))?;
            letters.push(rep.to_string());
        }
        words.push(letters.join(" "));
    }
    println!("{}", words.join(" / "));
    Ok(())
}

fn configure(control: &ControlPlane, args: &Args) -> Result<()> {
    control.set_speed(args.wpm)?;
    control.set_frequency(args.tone)?;
    control.set_volume(args.volume)?;
    control.set_gap(args.gap)?;
    control.set_weighting(args.weighting)?;
    control.set_tone_slope(Some(args.tone_shape.into()), Some(args.slope_len_us))?;
    Ok(())
}

fn interactive_mode(control: &mut ControlPlane, args: &Args) -> Result<()> {
    if args.straight_key {
        control.enable_straight_key();
        println!("Straight key mode - press any key to close, release is simulated on the next key (Esc to quit):\n");
        loop {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Esc => break,
                    KeyCode::Char(_) => {
                        control.notify_straight_key(true)?;
                        control.notify_straight_key(false)?;
                    }
                    _ => {}
                }
            }
        }
        return Ok(());
    }

    println!("Interactive mode - type away (Esc to quit):\n");
    loop {
        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Esc => break,
                KeyCode::Char(c) => {
                    if let Err(e) = control.send_character(c) {
                        eprintln!("\n{e}");
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if matches!(args.output, OutputBackend::Text) && args.output_file.is_none() {
        let text = read_input(&args)?;
        return print_morse(&text);
    }

    let sink = build_sink(&args)?;
    let mut control = ControlPlane::new(sink)?;
    configure(&control, &args)?;
    control.start()?;

    if args.interactive {
        interactive_mode(&mut control, &args)?;
    } else {
        let text = read_input(&args)?;
        control.send_string(&text)?;
        control.wait_for_tone_queue();
    }

    control.stop()?;
    Ok(())
}

fn read_input(args: &Args) -> Result<String> {
    if let Some(path) = &args.file {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
