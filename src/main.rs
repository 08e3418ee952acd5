use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use ngoni::{load_composition, Config, NgoniError};

#[derive(Parser)]
#[command(name = "ngoni", version, about = "Ngonilélé tablature tools")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the parsed events as JSON
    Events { input: PathBuf },

    /// Print the canonical tablature text
    Fmt { input: PathBuf },

    /// Render offline and write a WAV file
    Render {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        bpm: Option<f64>,
        /// Playback speed multiplier applied to the render
        #[arg(long)]
        speed: Option<f64>,
    },

    /// Play on the default audio device
    #[cfg(feature = "device")]
    Play {
        input: PathBuf,
        #[arg(long)]
        bpm: Option<f64>,
        #[arg(long)]
        speed: Option<f64>,
        #[arg(long)]
        metronome: bool,
        /// 3/4 metronome accents
        #[arg(long)]
        ternary: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), NgoniError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Events { input } => {
            let composition = load_composition(&input, &config)?;
            println!("{}", ngoni::events_json(composition.tablature.source())?);
        }
        Command::Fmt { input } => {
            let composition = load_composition(&input, &config)?;
            println!("{}", ngoni::normalize(composition.tablature.source()));
        }
        Command::Render {
            input,
            output,
            bpm,
            speed,
        } => {
            let mut composition = load_composition(&input, &config)?;
            if let Some(bpm) = bpm {
                composition.bpm = ngoni::config::clamp_bpm(bpm);
            }
            // the export tempo is speed-free; fold a requested speed into bpm
            if let Some(speed) = speed {
                composition.bpm *= ngoni::config::clamp_speed(speed, 1.0);
            }
            if ngoni::export_composition(&composition, &config, &output)? {
                eprintln!("Wrote {}", output.display());
            } else {
                eprintln!("Nothing to render: no notes in {}", input.display());
            }
        }
        #[cfg(feature = "device")]
        Command::Play {
            input,
            bpm,
            speed,
            metronome,
            ternary,
        } => play(&config, input, bpm, speed, metronome, ternary)?,
    }
    Ok(())
}

#[cfg(feature = "device")]
fn play(
    config: &Config,
    input: PathBuf,
    bpm: Option<f64>,
    speed: Option<f64>,
    metronome: bool,
    ternary: bool,
) -> Result<(), NgoniError> {
    use std::time::Duration;

    use ngoni::audio::{AudioOutput, DeviceOutput};
    use ngoni::{RhythmMode, Transport, TransportEvent};

    let composition = load_composition(&input, config)?;
    let device = DeviceOutput::open()?;
    let output = device.handle();
    let bank = ngoni::sample_bank(config, output.sample_rate(), &composition.tuning);

    let mut transport = Transport::new(output, bank, config);
    transport.set_events(composition.tablature.events().to_vec());
    transport.set_tuning(composition.tuning.clone());
    transport.set_bpm(bpm.unwrap_or(composition.bpm));
    transport.set_speed(speed.unwrap_or(config.speed));
    transport.set_metronome(metronome || config.metronome);
    transport.set_rhythm_mode(if ternary {
        RhythmMode::Ternary
    } else {
        composition.rhythm_mode
    });
    transport.play()?;

    loop {
        for event in transport.poll_events() {
            match event {
                TransportEvent::Tick(_) => {}
                TransportEvent::Ended => return Ok(()),
                TransportEvent::Failed(reason) => {
                    eprintln!("Playback stopped: {}", reason);
                    process::exit(1);
                }
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
