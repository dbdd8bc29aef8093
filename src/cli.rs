//! Command line surface

use clap::{App as ClapApp, ArgMatches};
use std::error::Error;
use std::ffi::OsString;
use std::time::Duration;

use super::{Config, Dest, DEFAULT_SIZES, LARGE_SIZES};
use crate::logger::StdLogger;
use crate::report::Layout;

/// Application initialization
pub struct App;

impl App {
    /// Retrieve user input from command line
    ///
    /// The user can modify the following parameters of the application:
    /// - destination: Either as IP address or domain name (required)
    /// - count: The number of pings per payload size (default 25)
    /// - pause: The pause between consecutive pings (default 5ms)
    /// - timeout: The time to wait for each reply (default 1,000ms)
    /// - large: Extend the sweep with payloads larger than the usual MTU
    /// - size: Sweep only the given payload sizes instead
    /// - identifier: The ICMP identifier of the echo requests (default 1)
    /// - percentiles: Report percentiles instead of mean and standard deviation
    ///
    /// Payloads beyond the Maximum Transmission Unit of the path get fragmented. The default sweep
    /// stops at 1472 bytes, which together with the ICMP and IP headers fills a 1500 byte frame.
    pub fn parse_args() -> Result<Config, Box<dyn Error>> {
        let matches = Self::app().get_matches();
        Self::config_from(&matches)
    }

    /// Parse an explicit argument list
    ///
    /// Unlike [`parse_args`](App::parse_args) this never exits the process; help and usage errors
    /// are returned as errors.
    pub fn parse_from<I, T>(args: I) -> Result<Config, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::app().get_matches_from_safe(args)?;
        Self::config_from(&matches)
    }

    // Define CLI interface here
    fn app() -> ClapApp<'static, 'static> {
        clap_app!(("ping-sweep") =>
            (version: crate_version!())
            (about: "Ping a host over a sweep of payload sizes and report latency and loss")
            (@arg destination: +required "Host name or destination address")
            (@arg verbose: -v --verbose +multiple "Raises the level of verbosity")
            (@arg count: -c --count +takes_value "Number of pings at each payload size")
            (@arg pause: -p --pause +takes_value "Pause between individual pings (in ms)")
            (@arg timeout: -t --timeout +takes_value "Timeout per ping (in ms)")
            (@arg large: -L --large "Add payloads larger than 1472 bytes to the sweep")
            (@arg size: -s --size +takes_value +multiple number_of_values(1) conflicts_with[large]
                "Sweep this payload size (in Bytes), may be repeated")
            (@arg identifier: -i --identifier +takes_value "ICMP identifier of the echo requests")
            (@arg percentiles: -P --percentiles "Report percentiles instead of mean and spread"))
    }

    fn config_from(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
        StdLogger::init(matches.occurrences_of("verbose"));

        // Clap states calling `unwrap` on a required value is always safe
        let dest = Dest::parse(matches.value_of("destination").unwrap());
        let mut config = Config::new(dest);

        if let Some(count) = matches.value_of("count") {
            config.count = count.parse::<usize>()?;
        }
        if let Some(pause) = matches.value_of("pause") {
            config.pause = Duration::from_millis(pause.parse::<u64>()?);
        }
        if let Some(timeout) = matches.value_of("timeout") {
            config.timeout = Duration::from_millis(timeout.parse::<u64>()?);
        }
        if let Some(identifier) = matches.value_of("identifier") {
            config.identifier = identifier.parse::<u16>()?;
        }

        config.sizes = match matches.values_of("size") {
            Some(sizes) => sizes
                .map(|size| size.parse::<usize>())
                .collect::<Result<Vec<_>, _>>()?,
            None if matches.is_present("large") => LARGE_SIZES.to_vec(),
            None => DEFAULT_SIZES.to_vec(),
        };
        if config.sizes.iter().any(|&size| size > 1472) {
            warn!("Beware of the Maximum Transmission Unit supported by your network");
            warn!("Payloads above 1472 bytes are fragmented and may be dropped on the way");
        }

        if matches.is_present("percentiles") {
            config.layout = Layout::Percentiles;
        }

        trace!("Parsed configuration.");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn default_config() {
        let config = App::parse_from(vec!["ping-sweep", "127.0.0.1"]).unwrap();
        assert_eq!(
            config.dest,
            Dest::Ip(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)))
        );
        assert_eq!(config.sizes, DEFAULT_SIZES.to_vec());
        assert_eq!(config.count, 25);
        assert_eq!(config.pause, Duration::from_millis(5));
        assert_eq!(config.timeout, Duration::from_millis(1000));
        assert_eq!(config.identifier, 1);
        assert_eq!(config.layout, Layout::Spread);
    }

    #[test]
    fn custom_config() {
        let config = App::parse_from(vec![
            "ping-sweep", "-c", "3", "-p", "0", "-t", "250", "-i", "4242", "-P", "example.com",
        ])
        .unwrap();
        assert_eq!(config.dest, Dest::Host("example.com".into()));
        assert_eq!(config.count, 3);
        assert_eq!(config.pause, Duration::from_millis(0));
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.identifier, 4242);
        assert_eq!(config.layout, Layout::Percentiles);
    }

    #[test]
    fn large_sweep() {
        let config = App::parse_from(vec!["ping-sweep", "--large", "10.0.0.1"]).unwrap();
        assert_eq!(config.sizes, LARGE_SIZES.to_vec());
        assert_eq!(config.sizes.last(), Some(&32768));
    }

    #[test]
    fn explicit_sizes_keep_their_order() {
        let config =
            App::parse_from(vec!["ping-sweep", "-s", "64", "-s", "16", "10.0.0.1"]).unwrap();
        assert_eq!(config.sizes, vec![64, 16]);
    }

    #[test]
    fn invalid_numbers_are_usage_errors() {
        assert!(App::parse_from(vec!["ping-sweep", "-c", "many", "10.0.0.1"]).is_err());
        assert!(App::parse_from(vec!["ping-sweep", "-i", "70000", "10.0.0.1"]).is_err());
        assert!(App::parse_from(vec!["ping-sweep", "-s", "-5", "10.0.0.1"]).is_err());
    }

    #[test]
    fn destination_is_required() {
        assert!(App::parse_from(vec!["ping-sweep"]).is_err());
    }
}
