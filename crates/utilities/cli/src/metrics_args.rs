//! Prometheus exporter arguments.

use crate::{CliResult, init_prometheus_server};
use clap::Args;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Prometheus exporter arguments.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serves Prometheus metrics over HTTP.
    #[arg(long = "metrics.enabled", env = "ARCHIVIST_METRICS_ENABLED", default_value_t = false)]
    pub enabled: bool,

    /// Listen address of the metrics server.
    #[arg(long = "metrics.addr", env = "ARCHIVIST_METRICS_ADDR", default_value = "0.0.0.0")]
    pub addr: IpAddr,

    /// Listen port of the metrics server. `0` picks a free port.
    #[arg(long = "metrics.port", env = "ARCHIVIST_METRICS_PORT", default_value_t = 9615)]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 9615 }
    }
}

impl MetricsArgs {
    /// Starts the metrics server if enabled and returns its address.
    pub fn init_metrics(&self) -> CliResult<Option<SocketAddr>> {
        if !self.enabled {
            return Ok(None);
        }
        Ok(Some(init_prometheus_server(self.addr, self.port)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        metrics: MetricsArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::try_parse_from(["test"]).unwrap();
        assert_eq!(cli.metrics, MetricsArgs::default());
        assert_eq!(cli.metrics.init_metrics().unwrap(), None);
    }

    #[test]
    fn test_flags() {
        let cli = TestCli::try_parse_from([
            "test",
            "--metrics.enabled",
            "--metrics.addr",
            "127.0.0.1",
            "--metrics.port",
            "9000",
        ])
        .unwrap();
        assert!(cli.metrics.enabled);
        assert_eq!(cli.metrics.addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(cli.metrics.port, 9000);
    }
}
