use std::collections::VecDeque;
use std::error::Error;
use std::fs;
use std::process::ExitCode;

use rmo::{env_flag, GraphDef, Model, ModelOptions, NodeId};

mod dim_size;
use dim_size::DimSize;

struct Args {
    /// Graph description file to load.
    model: String,

    /// Sizes for symbolic input dimensions.
    input_sizes: Vec<DimSize>,

    /// Print the attributes each operator passes to backends.
    attrs: bool,

    /// Enable verbose logging.
    verbose: bool,
}

fn parse_args() -> Result<Args, lexopt::Error> {
    use lexopt::prelude::*;

    let mut values = VecDeque::new();
    let mut input_sizes = Vec::new();
    let mut attrs = false;
    let mut verbose = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Value(val) => values.push_back(val.string()?),
            Short('a') | Long("attrs") => attrs = true,
            Short('s') | Long("size") => {
                let size = parser.value()?.string()?;
                let size = DimSize::parse(&size).map_err(|err| err.to_string())?;
                input_sizes.push(size);
            }
            Short('v') | Long("verbose") => verbose = true,
            Short('h') | Long("help") => {
                println!(
                    "Load a model graph and infer the shapes of its values.

Usage: {bin_name} [OPTIONS] <model>

Arguments:

  <model>

    Path to a JSON graph description.

Options:

  -a, --attrs

    Print the attributes of each operator.

  -s, --size <spec>

    Set the size of a symbolic input dimension.

    <spec> is of the form `dim_name=size` or `input_name.dim_name=size`.
    Can be given multiple times. Symbolic dimensions without a size are
    kept symbolic in the inferred shapes.

  -v, --verbose

    Log each inferred node. Can also be enabled with RMO_VERBOSE=1.
    RUST_LOG overrides the log filter.

  -h, --help

    Print help
",
                    bin_name = parser.bin_name().unwrap_or("rmo")
                );
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    let model = values.pop_front().ok_or("missing `<model>` arg")?;
    DimSize::sort_dedup(&mut input_sizes);

    Ok(Args {
        model,
        input_sizes,
        attrs,
        verbose,
    })
}

/// Set up log output on stderr.
///
/// `RUST_LOG` sets the filter if present. Otherwise warnings are logged, or
/// debug messages from the `rmo` crates when `verbose` is set.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_filter = if verbose { "warn,rmo=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}

/// Format the shapes of the values connected to a list of ports.
fn format_ports(model: &Model, ids: &[Option<NodeId>]) -> String {
    let ports: Vec<String> = ids
        .iter()
        .map(|id| match id {
            Some(id) => {
                let name = model.node_name(*id);
                let shape = model
                    .node_info(*id)
                    .and_then(|info| info.shape().map(|s| s.to_string()))
                    .unwrap_or("?".to_string());
                format!("{} {}", name, shape)
            }
            None => "-".to_string(),
        })
        .collect();
    ports.join(", ")
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let json = fs::read_to_string(&args.model)?;
    let mut graph_def = GraphDef::from_json(&json)?;
    graph_def.resolve_dims(|input_name, dim_name| {
        DimSize::resolve(&args.input_sizes, input_name, dim_name)
    });

    let mut model = ModelOptions::with_all_ops().load_def(&graph_def)?;
    let op_ids = model.operator_ids();

    println!(
        "Model stats: {} inputs, {} operators",
        model.input_ids().len(),
        op_ids.len(),
    );

    for id in model.input_ids() {
        let name = model.node_name(*id);
        let shape = model
            .node_info(*id)
            .and_then(|info| info.shape().map(|s| s.to_string()))
            .unwrap_or("(unknown)".to_string());
        println!("Input \"{}\" shape {}", name, shape);
    }

    let result = model.infer_shapes();

    for op_id in op_ids {
        let Some(info) = model.node_info(op_id) else {
            continue;
        };
        let Some(op) = info.operator() else {
            continue;
        };
        println!(
            "{} \"{}\" ({})",
            op.name(),
            model.node_name(op_id),
            op.version()
        );
        println!("  inputs:  {}", format_ports(&model, info.input_ids()));
        println!("  outputs: {}", format_ports(&model, info.output_ids()));

        if args.attrs {
            let attrs: Vec<String> = op
                .backend_attrs()
                .into_iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            println!("  attrs:   {}", attrs.join(" "));
        }
    }

    result?;

    Ok(())
}

/// Tool for inspecting model graphs and the shapes inferred for their values.
///
/// ```text
/// cargo run -p rmo-cli -- demos/prior_grid.json -s height=50 -s width=84
/// ```
fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(args.verbose || env_flag("RMO_VERBOSE", false));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
