#[macro_use]
extern crate log;

use std::path::Path;
use std::process;

use clap::{Arg, ArgMatches, Command};
use umbra_core::internal::*;

mod params;

use params::ModelFormat;

fn main() {
    let app = Command::new("umbra")
        .version(clap::crate_version!())
        .about("Run a network on the native engine and dump its outputs")
        .arg(Arg::new("model").required(true).help("Sets the model to use"))
        .arg(
            Arg::new("format")
                .long("format")
                .takes_value(true)
                .possible_values(["auto", "bin", "text"])
                .default_value("auto")
                .help("Model encoding, guessed from the extension by default"),
        )
        .arg(
            Arg::new("weights")
                .long("weights")
                .takes_value(true)
                .help("Flat weight file, one blob after the other (text models only)"),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Set input value (name=f32:1,3,224,224:0.5)"),
        )
        .arg(
            Arg::new("shape")
                .long("shape")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Reshape a blob before running (name=1,3,224,224)"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .multiple_occurrences(true)
                .help("Sets the level of verbosity"),
        );
    let matches = app.get_matches();

    let level = match matches.occurrences_of("verbosity") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().filter_or("UMBRA_LOG", level);
    env_logger::Builder::from_env(env).init();

    if let Err(e) = handle(&matches) {
        error!("{:?}", e);
        process::exit(1)
    }
}

fn load(matches: &ArgMatches) -> UmbraResult<Native> {
    let model = matches.value_of("model").context("No model given")?;
    let path = Path::new(model);
    let format = ModelFormat::for_path(matches.value_of("format").unwrap_or("auto"), path)?;
    let mut engine = Native::default();
    match (format, matches.value_of("weights")) {
        (ModelFormat::Binary, Some(_)) => bail!("External weights only apply to text models"),
        (ModelFormat::Binary, None) => engine.load_binary_file(path)?,
        (ModelFormat::Text, None) => engine.load_text(model)?,
        (ModelFormat::Text, Some(weights)) => {
            let bytes = fs_err::read(weights)?;
            let buffer = Buffer::from_bytes(&bytes, DEFAULT_ALIGNMENT)?;
            engine.load_text_with_weights(model, Weights::Flat(Arc::new(buffer)))?
        }
    }
    info!("Loaded {} ({} operators)", model, engine.ops().len());
    Ok(engine)
}

fn handle(matches: &ArgMatches) -> UmbraResult<()> {
    let mut engine = load(matches)?;

    let mut shapes = HashMap::new();
    for spec in matches.values_of("shape").into_iter().flatten() {
        let (name, shape) = params::parse_shape_spec(spec)?;
        shapes.insert(name, shape);
    }
    let mut tensors = vec![];
    for spec in matches.values_of("input").into_iter().flatten() {
        let (name, tensor) = params::parse_input_spec(spec)?;
        shapes.entry(name.clone()).or_insert_with(|| tensor.shape().into());
        tensors.push((name, tensor));
    }
    for name in engine.in_blobs() {
        if !tensors.iter().any(|(n, _)| n == name) {
            warn!("No value given for input {}, keeping its current content", name);
        }
    }
    let inputs: HashMap<String, InputData> =
        tensors.iter().map(|(name, t)| (name.clone(), InputData::from(t))).collect();

    engine.forward(&inputs, &shapes)?;

    for name in engine.out_blobs() {
        let output = engine.workspace().get(name)?;
        println!("{}: {}", name, *output);
    }
    Ok(())
}
