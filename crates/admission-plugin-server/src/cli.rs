use clap::builder::PossibleValue;
use clap::{crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, Command};

use crate::config::{DEFAULT_CLIENT_CA_CONFIGMAP, DEFAULT_CLIENT_CA_KEY, DEFAULT_CLIENT_CA_NAMESPACE};

pub fn build_cli() -> Command {
    let mut args = vec![
            Arg::new("log-level")
                .long("log-level")
                .value_name("LOG_LEVEL")
                .env("ADMISSION_PLUGIN_LOG_LEVEL")
                .default_value("info")
                .value_parser([
                    PossibleValue::new("trace"),
                    PossibleValue::new("debug"),
                    PossibleValue::new("info"),
                    PossibleValue::new("warn"),
                    PossibleValue::new("error"),
                ])
                .help("Log level"),
            Arg::new("log-fmt")
                .long("log-fmt")
                .value_name("LOG_FMT")
                .env("ADMISSION_PLUGIN_LOG_FMT")
                .default_value("text")
                .value_parser([
                    PossibleValue::new("text"),
                    PossibleValue::new("json"),
                ])
                .help("Log output format"),
            Arg::new("log-no-color")
                .long("log-no-color")
                .env("NO_COLOR")
                .action(ArgAction::SetTrue)
                .help("Disable colored output for logs"),
            Arg::new("address")
                .long("addr")
                .value_name("BIND_ADDRESS")
                .default_value("0.0.0.0")
                .env("ADMISSION_PLUGIN_BIND_ADDRESS")
                .help("Bind against ADDRESS"),
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .default_value("8443")
                .env("ADMISSION_PLUGIN_PORT")
                .help("Listen on PORT"),
            Arg::new("cert-file")
                .long("cert-file")
                .value_name("CERT_FILE")
                .env("ADMISSION_PLUGIN_CERT_FILE")
                .required(true)
                .help("Path to a PEM file holding the server certificate chain"),
            Arg::new("key-file")
                .long("key-file")
                .value_name("KEY_FILE")
                .env("ADMISSION_PLUGIN_KEY_FILE")
                .required(true)
                .help("Path to a PEM file holding the server private key"),
            Arg::new("client-ca-configmap")
                .long("client-ca-configmap")
                .value_name("NAME")
                .env("ADMISSION_PLUGIN_CLIENT_CA_CONFIGMAP")
                .default_value(DEFAULT_CLIENT_CA_CONFIGMAP)
                .help("Name of the ConfigMap publishing the CA used to verify client certificates"),
            Arg::new("client-ca-namespace")
                .long("client-ca-namespace")
                .value_name("NAMESPACE")
                .env("ADMISSION_PLUGIN_CLIENT_CA_NAMESPACE")
                .default_value(DEFAULT_CLIENT_CA_NAMESPACE)
                .help("Namespace of the ConfigMap publishing the client CA"),
            Arg::new("client-ca-key")
                .long("client-ca-key")
                .value_name("KEY")
                .env("ADMISSION_PLUGIN_CLIENT_CA_KEY")
                .default_value(DEFAULT_CLIENT_CA_KEY)
                .help("Key of the ConfigMap holding the PEM encoded client CA bundle"),
            Arg::new("disable-timeout-protection")
                .long("disable-timeout-protection")
                .action(ArgAction::SetTrue)
                .env("ADMISSION_PLUGIN_DISABLE_TIMEOUT_PROTECTION")
                .help("Disable admission plugin timeout protection"),
            Arg::new("policy-timeout")
                .long("policy-timeout")
                .env("ADMISSION_PLUGIN_POLICY_TIMEOUT")
                .value_name("MAXIMUM_EXECUTION_TIME_SECONDS")
                .default_value("2")
                .help("Interrupt the admission plugin evaluation after the given time"),
    ];
    args.sort_by(|a, b| a.get_id().cmp(b.get_id()));

    Command::new(crate_name!())
        .author(crate_authors!())
        .version(crate_version!())
        .about(crate_description!())
        .args(args)
}
