use clap::{App, Arg, SubCommand};
use framepipe::{
    ChannelConfig, ChannelNames, FrameFormat, Pacer, RingTransport, Result,
};
use std::{thread, time::Duration};

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("framepipe-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Shared-memory frame transport demo")
        .subcommand(
            SubCommand::with_name("consume")
                .about("Create the channel and drain it at a fixed rate")
                .arg(
                    Arg::with_name("prefix")
                        .short("p")
                        .long("prefix")
                        .value_name("PREFIX")
                        .help("Name prefix for the channel objects")
                        .default_value("/framepipe")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("width")
                        .long("width")
                        .value_name("PIXELS")
                        .default_value("640")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("height")
                        .long("height")
                        .value_name("PIXELS")
                        .default_value("480")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("fps")
                        .long("fps")
                        .value_name("FPS")
                        .help("Output frame rate")
                        .default_value("30")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("ticks")
                        .long("ticks")
                        .value_name("COUNT")
                        .help("Number of output ticks before exiting")
                        .default_value("300")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("produce")
                .about("Attach to an existing channel and push synthetic frames")
                .arg(
                    Arg::with_name("prefix")
                        .short("p")
                        .long("prefix")
                        .value_name("PREFIX")
                        .default_value("/framepipe")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("fps")
                        .long("fps")
                        .value_name("FPS")
                        .help("Push rate")
                        .default_value("30")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("frames")
                        .long("frames")
                        .value_name("COUNT")
                        .help("Number of frames to push before exiting")
                        .default_value("300")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("format")
                .about("Print the current frame format of an existing channel")
                .arg(
                    Arg::with_name("prefix")
                        .short("p")
                        .long("prefix")
                        .value_name("PREFIX")
                        .default_value("/framepipe")
                        .takes_value(true),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("consume", Some(sub)) => {
            let names = ChannelNames::with_prefix(sub.value_of("prefix").unwrap());
            let width: u32 = parse_arg(sub.value_of("width").unwrap(), "width")?;
            let height: u32 = parse_arg(sub.value_of("height").unwrap(), "height")?;
            let fps: u32 = parse_arg(sub.value_of("fps").unwrap(), "fps")?;
            let ticks: u64 = parse_arg(sub.value_of("ticks").unwrap(), "ticks")?;
            consume(names, width, height, fps, ticks)
        }
        ("produce", Some(sub)) => {
            let names = ChannelNames::with_prefix(sub.value_of("prefix").unwrap());
            let fps: u32 = parse_arg(sub.value_of("fps").unwrap(), "fps")?;
            let frames: u64 = parse_arg(sub.value_of("frames").unwrap(), "frames")?;
            produce(names, fps, frames)
        }
        ("format", Some(sub)) => {
            let names = ChannelNames::with_prefix(sub.value_of("prefix").unwrap());
            let pipe = RingTransport::open_as_attacher(&names)?;
            let format = pipe.format()?;
            println!(
                "{}x{} at {} bytes per pixel",
                format.width, format.height, format.bytes_per_pixel
            );
            Ok(())
        }
        _ => {
            eprintln!("No subcommand given; try --help");
            Ok(())
        }
    }
}

fn parse_arg<T: std::str::FromStr>(value: &str, name: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| framepipe::FramePipeError::invalid_parameter(name, "Not a valid number"))
}

fn consume(names: ChannelNames, width: u32, height: u32, fps: u32, ticks: u64) -> Result<()> {
    if fps == 0 {
        return Err(framepipe::FramePipeError::invalid_parameter(
            "fps",
            "Frame rate must be greater than 0",
        ));
    }
    let format = FrameFormat::new(width, height, 3);
    let config = ChannelConfig::default()
        .with_names(names)
        .with_format(format);

    let mut pipe = RingTransport::open_as_owner(&config)?;
    let interval = Duration::from_secs(1) / fps;
    let mut pacer = Pacer::new(interval);
    let mut dst = vec![0u8; config.size_per_slot as usize];

    println!(
        "consuming {}x{} at {} fps on {}",
        width, height, fps, pipe.names().region
    );

    for tick in 0..ticks {
        let paced = pacer.tick(&mut pipe, &mut dst);
        println!(
            "tick {:4} [{:>12} .. {:>12}) {:?}",
            tick, paced.start, paced.end, paced.freshness
        );
        thread::sleep(interval);
    }
    Ok(())
}

fn produce(names: ChannelNames, fps: u32, frames: u64) -> Result<()> {
    if fps == 0 {
        return Err(framepipe::FramePipeError::invalid_parameter(
            "fps",
            "Frame rate must be greater than 0",
        ));
    }
    let mut pipe = RingTransport::open_as_attacher(&names)?;
    let format = pipe.format()?;
    let interval = Duration::from_secs(1) / fps;
    let mut data = vec![0u8; format.frame_size()];

    println!(
        "producing {}x{} at {} fps on {}",
        format.width, format.height, fps, pipe.names().region
    );

    for frame in 0..frames {
        // Rolling fill so consecutive frames are distinguishable
        data.fill((frame % 251) as u8);
        match pipe.push(format, &data, Duration::from_millis(4)) {
            Ok(()) => {}
            Err(framepipe::FramePipeError::LockTimeout { .. }) => {
                log::debug!("frame {} dropped on lock timeout", frame);
            }
            Err(e) => return Err(e),
        }
        thread::sleep(interval);
    }
    Ok(())
}
