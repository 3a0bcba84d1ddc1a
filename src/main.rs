use anyhow::Context;
use clap::{Parser, Subcommand};
use knx_rs::{
    decode_frame, encode_frame, init_logger, log_info, Apci, DeviceConfig, DptRegistry, DptValue,
    GroupAddress, IndividualAddress, KnxAddress, KnxStack, LinkFrame, MockTransceiver, Npdu,
    Priority, Tpdu, ValueKind,
};
use knx_rs::dpt::{KnxTime, StepControl};
use knx_rs::layers::application::{decode_group_value, encode_group_value};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "knx-cli")]
#[command(about = "CLI tool for KNX group telegrams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a group telegram and print it as hex.
    Encode {
        /// Destination group address, e.g. 1/1/1
        group: String,
        /// Datapoint type, e.g. 9.001
        dpt: String,
        /// Value in the DPT's text form, e.g. 21.5
        value: String,
        #[arg(short, long, default_value = "1.1.1")]
        source: String,
        #[arg(short, long, default_value = "normal")]
        priority: String,
        /// Send a GroupValueResponse instead of a GroupValueWrite.
        #[arg(long)]
        response: bool,
    },
    /// Decode a hex telegram and print its fields.
    Decode {
        /// Whole telegram as hex, e.g. bc110a0901e10081a6
        hex: String,
        /// Decode the payload with this DPT, e.g. 9.001
        #[arg(short, long)]
        dpt: Option<String>,
    },
    /// Load a device configuration and drive one local write through the
    /// stack, printing what reaches the bus.
    Simulate {
        /// Path to a device configuration JSON file
        config: String,
        /// Output datapoint to write
        datapoint: String,
        /// Value in the DPT's text form
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    let registry = DptRegistry::with_defaults();

    match cli.command {
        Commands::Encode {
            group,
            dpt,
            value,
            source,
            priority,
            response,
        } => {
            let group: GroupAddress = group.parse()?;
            let source: IndividualAddress = source.parse()?;
            let priority: Priority = priority.parse()?;
            let codec = registry.lookup_str(&dpt)?;
            let value = parse_value(codec.value_kind(), &value)?;
            let apci = if response {
                Apci::GroupValueResponse
            } else {
                Apci::GroupValueWrite
            };
            let apdu = encode_group_value(apci, codec.as_ref(), &value)?;
            let npdu = Npdu::new(source, KnxAddress::Group(group), Tpdu::group(apdu));
            let bytes = encode_frame(&LinkFrame::new(priority, npdu))?;
            println!("{}", hex::encode(bytes));
        }
        Commands::Decode { hex, dpt } => {
            let bytes = hex::decode(hex.trim()).context("telegram is not valid hex")?;
            let frame = decode_frame(&bytes)?;
            println!("source:      {}", frame.npdu.source);
            println!("destination: {}", frame.npdu.destination);
            println!("priority:    {:?}", frame.priority);
            println!("hop count:   {}", frame.npdu.hop_count);
            if let Some(apdu) = &frame.npdu.tpdu.apdu {
                println!("service:     {:?}", apdu.apci);
                if let Some(dpt) = dpt {
                    let codec = registry.lookup_str(&dpt)?;
                    let value = decode_group_value(apdu, codec.as_ref())?;
                    println!("value:       {value}");
                }
            } else {
                println!("service:     {:?}", frame.npdu.tpdu.control);
            }
        }
        Commands::Simulate {
            config,
            datapoint,
            value,
        } => {
            let json = std::fs::read_to_string(&config)
                .with_context(|| format!("cannot read {config}"))?;
            let config = DeviceConfig::from_json(&json)?;
            let registry = Arc::new(registry);
            let transceiver = Arc::new(MockTransceiver::new());
            let stack = KnxStack::new(
                config.individual_address()?,
                Arc::clone(&registry),
                Arc::clone(&transceiver) as Arc<dyn knx_rs::Transceiver>,
            );
            config.apply(stack.service(), &registry)?;
            stack.start();

            let dpt = config
                .datapoints
                .iter()
                .find(|d| d.name == datapoint)
                .map(|d| d.dpt.clone())
                .context("datapoint not in configuration")?;
            let codec = registry.lookup_str(&dpt)?;
            stack.write(&datapoint, parse_value(codec.value_kind(), &value)?)?;
            tokio::task::yield_now().await;
            stack.stop().await;

            for frame in transceiver.sent_frames() {
                log_info(&format!("Bus: {}", hex::encode(&frame)));
                println!("{}", hex::encode(frame));
            }
        }
    }

    Ok(())
}

/// Parses a CLI value literal into the variant a codec expects.
fn parse_value(kind: ValueKind, s: &str) -> anyhow::Result<DptValue> {
    let value = match kind {
        ValueKind::Bool => match s.to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => DptValue::Bool(true),
            "false" | "off" | "0" => DptValue::Bool(false),
            _ => anyhow::bail!("{s:?} is not a boolean"),
        },
        ValueKind::Int => DptValue::Int(s.parse()?),
        ValueKind::Float => DptValue::Float(s.parse()?),
        ValueKind::Str => DptValue::Str(s.to_string()),
        ValueKind::Date => DptValue::Date(chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")?),
        ValueKind::Time => DptValue::Time(KnxTime {
            weekday: None,
            time: chrono::NaiveTime::parse_from_str(s, "%H:%M:%S")?,
        }),
        ValueKind::Step => match s.split_once(' ') {
            _ if s == "stop" => DptValue::Step(StepControl::stop()),
            Some(("up", n)) => DptValue::Step(StepControl {
                increase: true,
                step: n.parse()?,
            }),
            Some(("down", n)) => DptValue::Step(StepControl {
                increase: false,
                step: n.parse()?,
            }),
            _ => anyhow::bail!("{s:?} is not a step command (up N, down N, stop)"),
        },
    };
    Ok(value)
}
