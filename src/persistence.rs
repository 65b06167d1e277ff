//! Weight files.
//!
//! The text format stores `W1, b1, W2, b2` row by row after a size header. The
//! verbose variant labels the header and every section and brackets each row;
//! [`load`] reads either. Snapshots are gzipped JSON and keep the network
//! configuration and exact weights.
use crate::config::{NetworkConfig, SaveOptions};
use crate::error::{Error, Result};
use crate::network::Network;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const HEADER_LABELS: [&str; 3] = ["Input Nodes", "Hidden Nodes", "Output Nodes"];

/// Write the network's weights as text.
pub fn save(network: &Network, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
    let path = path.as_ref();
    let text = render(network, options);
    write_atomically(path, text.as_bytes())?;
    debug!(path = %path.display(), verbose = options.verbose, "saved weights");
    Ok(())
}

/// Render the weight file contents.
pub fn render(network: &Network, options: &SaveOptions) -> String {
    let SaveOptions { verbose, precision } = *options;
    let (i, h, o) = (
        network.input_size(),
        network.hidden_size(),
        network.output_size(),
    );
    let mut out = String::new();
    if verbose {
        for (label, n) in HEADER_LABELS.iter().zip([i, h, o]) {
            out.push_str(&format!("{:<12}: {}\n", label, n));
        }
    } else {
        out.push_str(&format!("{} {} {}\n", i, h, o));
    }

    let sections: [(&str, Vec<&[f64]>); 4] = [
        (
            "Input/Hidden Weights:",
            network.hidden_weights().iter().map(Vec::as_slice).collect(),
        ),
        ("Hidden Layer Biases:", vec![network.hidden_bias()]),
        (
            "Hidden/Output Weights:",
            network.output_weights().iter().map(Vec::as_slice).collect(),
        ),
        ("Output Layer Biases:", vec![network.output_bias()]),
    ];
    for (label, rows) in sections {
        if verbose {
            out.push_str(label);
            out.push('\n');
        }
        for row in rows {
            out.push_str(&format_row(row, verbose, precision));
            out.push('\n');
        }
    }
    out
}

fn format_row(values: &[f64], verbose: bool, precision: usize) -> String {
    let width = if verbose { precision + 3 } else { 0 };
    let items: Vec<String> = values
        .iter()
        .map(|v| format!("{:>width$.precision$}", v, width = width, precision = precision))
        .collect();
    let row = items.join(" ");
    if verbose {
        format!("[ {} ]", row)
    } else {
        row
    }
}

/// Parsed weight file: layer sizes plus the flat parameter vector.
#[derive(Debug, Clone, PartialEq)]
struct WeightFile {
    sizes: [usize; 3],
    weights: Vec<f64>,
}

fn parse(text: &str) -> Result<WeightFile> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(n, l)| (n + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .peekable();

    let verbose = lines.peek().is_some_and(|(_, l)| l.contains(':'));
    let mut sizes = [0usize; 3];
    if verbose {
        for (slot, label) in sizes.iter_mut().zip(HEADER_LABELS) {
            let (n, line) = lines
                .next()
                .ok_or_else(|| Error::format("weight file ends inside the header"))?;
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::format(format!("line {}: expected '{}: n'", n, label)))?;
            if name.trim() != label {
                return Err(Error::format(format!("line {}: expected '{}'", n, label)));
            }
            *slot = parse_size(value, n)?;
        }
    } else {
        let (n, line) = lines
            .next()
            .ok_or_else(|| Error::format("weight file is empty"))?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(Error::format(format!(
                "line {}: header must hold three layer sizes",
                n
            )));
        }
        for (slot, field) in sizes.iter_mut().zip(fields) {
            *slot = parse_size(field, n)?;
        }
    }

    let mut rows: Vec<(usize, Vec<f64>)> = Vec::new();
    for (n, line) in lines {
        if line.ends_with(':') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|tok| tok.trim_matches(|c| c == '[' || c == ']'))
            .filter(|tok| !tok.is_empty())
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| Error::format(format!("line {}: cannot parse {:?}", n, tok)))
            })
            .collect::<Result<Vec<f64>>>()?;
        if !row.is_empty() {
            rows.push((n, row));
        }
    }

    let [i, h, o] = sizes;
    let expected: Vec<usize> = std::iter::repeat(h)
        .take(i)
        .chain([h])
        .chain(std::iter::repeat(o).take(h))
        .chain([o])
        .collect();
    if rows.len() != expected.len() {
        return Err(Error::format(format!(
            "expected {} weight rows for a [{}, {}, {}] network, found {}",
            expected.len(),
            i,
            h,
            o,
            rows.len()
        )));
    }
    for ((n, row), width) in rows.iter().zip(&expected) {
        if row.len() != *width {
            return Err(Error::format(format!(
                "line {}: expected {} values, found {}",
                n,
                width,
                row.len()
            )));
        }
    }
    Ok(WeightFile {
        sizes,
        weights: rows.into_iter().flat_map(|(_, row)| row).collect(),
    })
}

fn parse_size(field: &str, line: usize) -> Result<usize> {
    match field.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::format(format!(
            "line {}: {:?} is not a positive layer size",
            line, field
        ))),
    }
}

/// Load a weight file (either layout) into a new network with the default
/// configuration.
pub fn load(path: impl AsRef<Path>) -> Result<Network> {
    load_with(path, &NetworkConfig::default())
}

/// Load a weight file into a new network built with `config`.
pub fn load_with(path: impl AsRef<Path>, config: &NetworkConfig) -> Result<Network> {
    let file = parse(&fs::read_to_string(path)?)?;
    let [i, h, o] = file.sizes;
    let mut network = Network::with_config(i, h, o, config)?;
    network.set_weights(&file.weights)?;
    Ok(network)
}

/// Load a weight file into an existing network of the same dimensions.
pub fn load_into(network: &mut Network, path: impl AsRef<Path>) -> Result<()> {
    let file = parse(&fs::read_to_string(path)?)?;
    let dims = [
        network.input_size(),
        network.hidden_size(),
        network.output_size(),
    ];
    if file.sizes != dims {
        return Err(Error::format(format!(
            "weight file is for a {:?} network, not {:?}",
            file.sizes, dims
        )));
    }
    network.set_weights(&file.weights)
}

#[derive(Debug, Serialize, Deserialize)]
struct NetworkSnapshot {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    config: NetworkConfig,
    weights: Vec<f64>,
}

/// Save a lossless snapshot (gzipped JSON).
pub fn save_snapshot(network: &Network, path: impl AsRef<Path>) -> Result<()> {
    let snapshot = NetworkSnapshot {
        input_size: network.input_size(),
        hidden_size: network.hidden_size(),
        output_size: network.output_size(),
        config: network.config().clone(),
        weights: network.weights(),
    };
    let json = serde_json::to_vec(&snapshot)?;
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&json)?;
    write_atomically(path.as_ref(), &enc.finish()?)
}

/// Load a snapshot written by [`save_snapshot`].
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Network> {
    let mut dec = GzDecoder::new(File::open(path)?);
    let mut buf = Vec::new();
    dec.read_to_end(&mut buf)?;
    let snapshot: NetworkSnapshot = serde_json::from_slice(&buf)?;
    let mut network = Network::with_config(
        snapshot.input_size,
        snapshot.hidden_size,
        snapshot.output_size,
        &snapshot.config,
    )
    .map_err(|e| Error::format(format!("snapshot describes an invalid network: {}", e)))?;
    network.set_weights(&snapshot.weights)?;
    Ok(network)
}

/// Write to a sibling temp file and rename it over `path`, so a failed write
/// never leaves a truncated file behind.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_network() -> Network {
        let mut net = Network::new(2, 2, 1).unwrap();
        // W1 (2x2), b1, W2 (2x1), b2
        net.set_weights(&[0.5, -0.25, 1.0, 0.125, 0.1, -0.2, 0.3, -0.4, 0.05])
            .unwrap();
        net
    }

    #[test]
    fn test_render_plain() {
        let text = render(&fixed_network(), &SaveOptions::default());
        assert_eq!(
            text,
            "2 2 1\n0.5000 -0.2500\n1.0000 0.1250\n0.1000 -0.2000\n0.3000\n-0.4000\n0.0500\n"
        );
    }

    #[test]
    fn test_render_verbose() {
        let opts = SaveOptions {
            verbose: true,
            precision: 2,
        };
        let text = render(&fixed_network(), &opts);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Input Nodes : 2");
        assert_eq!(lines[1], "Hidden Nodes: 2");
        assert_eq!(lines[2], "Output Nodes: 1");
        assert_eq!(lines[3], "Input/Hidden Weights:");
        assert_eq!(lines[4], "[  0.50 -0.25 ]");
        assert!(text.contains("Output Layer Biases:\n[  0.05 ]\n"));
    }

    #[test]
    fn test_parse_both_layouts() {
        let net = fixed_network();
        for verbose in [false, true] {
            let opts = SaveOptions {
                verbose,
                precision: 6,
            };
            let parsed = parse(&render(&net, &opts)).unwrap();
            assert_eq!(parsed.sizes, [2, 2, 1]);
            assert_eq!(parsed.weights, net.weights());
        }
    }

    #[test]
    fn test_parse_rejects_bad_content() {
        assert!(matches!(parse(""), Err(Error::Format(_))));
        assert!(matches!(parse("2 2\n"), Err(Error::Format(_))));
        assert!(matches!(parse("1 1 1\n0.1\n0.2\n0.3\n"), Err(Error::Format(_))));
        assert!(matches!(
            parse("1 1 1\n0.1\n0.2\nabc\n0.4\n"),
            Err(Error::Format(_))
        ));
        // Right count, wrong row shape.
        assert!(matches!(
            parse("1 2 1\n0.1\n0.2 0.3\n0.4 0.5\n0.6\n0.7\n"),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_save_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/iris/weights.dat");
        save(&fixed_network(), &path, &SaveOptions::default()).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.weights(), fixed_network().weights());
    }

    #[test]
    fn test_load_into_checks_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.dat");
        save(&fixed_network(), &path, &SaveOptions::default()).unwrap();
        let mut other = Network::new(3, 2, 1).unwrap();
        assert!(matches!(load_into(&mut other, &path), Err(Error::Format(_))));
        let mut same = Network::new(2, 2, 1).unwrap();
        load_into(&mut same, &path).unwrap();
        assert_eq!(same.weights(), fixed_network().weights());
    }

    #[test]
    fn test_failed_save_leaves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.dat");
        std::fs::write(&path, "previous").unwrap();
        // A directory at the destination makes the rename fail.
        let blocked = dir.path().join("blocked");
        std::fs::create_dir_all(blocked.join("inner")).unwrap();
        assert!(save(&fixed_network(), &blocked, &SaveOptions::default()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
        assert!(blocked.is_dir());
    }

    #[test]
    fn test_snapshot_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.snapshot");
        let cfg = NetworkConfig {
            momentum: 0.3,
            ..NetworkConfig::default()
        };
        let mut net = Network::with_config(3, 4, 2, &cfg).unwrap();
        net.forward(&[0.1, 0.2, 0.3]).unwrap();
        net.backward(&[1.0, 0.0], 0.1).unwrap();
        save_snapshot(&net, &path).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.weights(), net.weights());
        assert_eq!(loaded.config().momentum, 0.3);
    }
}
