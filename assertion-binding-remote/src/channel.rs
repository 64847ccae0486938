//! Attested channels to assertion generators.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use assertion_binding::HashAlgorithm;
use log::debug;

use crate::config::{ProtocolConfig, check_hash_algorithms};
use crate::error::AssertionError;
use crate::generator::{AssertionGenerator, RemoteAssertion, Session};
use crate::handshake::{ClientHello, binding_aad};
use crate::oracle::ReportOracle;
use crate::report::ReportData;
use crate::verification::check_report_binding;

/// Address of an assertion generator.
///
/// Two forms are accepted: `unix:<path>` for local sockets and
/// `<host>:<port>` for network endpoints.
///
/// # Examples
///
/// ```
/// use assertion_binding_remote::ServerAddress;
///
/// let tcp = ServerAddress::parse("generator.local:8443").unwrap();
/// assert_eq!(tcp.to_string(), "generator.local:8443");
///
/// let unix = ServerAddress::parse("unix:/run/assertion.sock").unwrap();
/// assert!(matches!(unix, ServerAddress::Unix { .. }));
///
/// assert!(ServerAddress::parse("").is_err());
/// assert!(ServerAddress::parse("host:99999").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServerAddress {
    /// A local socket path.
    Unix {
        /// Filesystem path of the socket
        path: String,
    },
    /// A network endpoint.
    Tcp {
        /// Host name or address
        host: String,
        /// Port number
        port: u16,
    },
}

impl ServerAddress {
    /// Parses an address.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::InvalidArgument` for empty input, input
    /// containing whitespace, or input in neither accepted form.
    pub fn parse(input: &str) -> Result<Self, AssertionError> {
        let invalid = |reason: &str| AssertionError::invalid_argument("server_address", reason);

        if input.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if input.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }

        if let Some(path) = input.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(invalid("unix address has no path"));
            }
            return Ok(Self::Unix {
                path: path.to_string(),
            });
        }

        let (host, port) = input
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected <host>:<port> or unix:<path>"))?;
        if host.is_empty() {
            return Err(invalid("host is empty"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| invalid("port is not a number between 0 and 65535"))?;

        Ok(Self::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl FromStr for ServerAddress {
    type Err = AssertionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(f, "unix:{path}"),
            Self::Tcp { host, port } => write!(f, "{host}:{port}"),
        }
    }
}

/// Client end of a connected, mutually attested channel.
pub trait AssertionGeneratorClient: Send {
    /// Asks the generator for an assertion over `user_data`.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::Transport` if the call fails.
    fn generate_remote_assertion(
        &self,
        user_data: &[u8],
    ) -> Result<RemoteAssertion, AssertionError>;
}

/// Opens mutually attested channels to assertion generators.
pub trait ChannelFactory: Send + Sync {
    /// Connects to the generator at `address` and completes the attested
    /// handshake.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::Transport` if nothing listens at `address`
    /// or the handshake fails.
    fn connect(
        &self,
        address: &ServerAddress,
    ) -> Result<Box<dyn AssertionGeneratorClient>, AssertionError>;
}

/// In-process registry of listening assertion generators.
#[derive(Debug, Default)]
pub struct LocalNetwork {
    listeners: RwLock<HashMap<ServerAddress, Arc<AssertionGenerator>>>,
}

impl LocalNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts serving `generator` at `address`.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::InvalidArgument` if the address is taken, or
    /// `AssertionError::Internal` if the registry lock is poisoned.
    pub fn bind(
        &self,
        address: ServerAddress,
        generator: Arc<AssertionGenerator>,
    ) -> Result<(), AssertionError> {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|_| AssertionError::internal("listener registry lock poisoned"))?;

        if listeners.contains_key(&address) {
            return Err(AssertionError::invalid_argument(
                "server_address",
                format!("{address} is already in use"),
            ));
        }
        debug!("assertion generator listening at {address}");
        listeners.insert(address, generator);
        Ok(())
    }

    /// Stops serving at `address`. Returns true if something was bound.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::Internal` if the registry lock is poisoned.
    pub fn unbind(&self, address: &ServerAddress) -> Result<bool, AssertionError> {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|_| AssertionError::internal("listener registry lock poisoned"))?;
        Ok(listeners.remove(address).is_some())
    }

    /// Returns the generator bound at `address`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::Internal` if the registry lock is poisoned.
    pub fn lookup(
        &self,
        address: &ServerAddress,
    ) -> Result<Option<Arc<AssertionGenerator>>, AssertionError> {
        let listeners = self
            .listeners
            .read()
            .map_err(|_| AssertionError::internal("listener registry lock poisoned"))?;
        Ok(listeners.get(address).cloned())
    }
}

/// Connects enclaves to generators on a [`LocalNetwork`].
///
/// Every connection runs the full handshake: both sides exchange hellos,
/// bind the transcript into reports and verify each other's report.
pub struct LocalChannelFactory {
    network: Arc<LocalNetwork>,
    oracle: Arc<dyn ReportOracle>,
    hash_algorithms: Vec<HashAlgorithm>,
}

impl LocalChannelFactory {
    /// Creates a factory for the enclave behind `oracle`.
    #[must_use]
    pub fn new(
        network: Arc<LocalNetwork>,
        oracle: Arc<dyn ReportOracle>,
        config: &ProtocolConfig,
    ) -> Self {
        Self {
            network,
            oracle,
            hash_algorithms: config.hash_algorithms.clone(),
        }
    }

    fn handshake(&self, generator: &Arc<AssertionGenerator>) -> Result<Session, AssertionError> {
        check_hash_algorithms(&self.hash_algorithms)?;
        let client_hello = ClientHello::new(self.oracle.target_info()?, self.hash_algorithms.clone());
        let pending = generator.accept(&client_hello)?;
        let server_hello = pending.server_hello();

        if !client_hello
            .hash_algorithms
            .contains(&server_hello.hash_algorithm)
        {
            return Err(AssertionError::transport(format!(
                "generator chose {} which was not offered",
                server_hello.hash_algorithm
            )));
        }

        let data = ReportData::from(binding_aad(&client_hello, server_hello)?);
        self.oracle.verify(pending.server_report())?;
        check_report_binding(pending.server_report(), &server_hello.target_info, &data)?;
        debug!(
            "verified generator {:?}",
            server_hello.target_info.measurement()
        );

        let client_report = self.oracle.produce(&server_hello.target_info, &data)?;
        pending.finish(&client_report)
    }
}

impl fmt::Debug for LocalChannelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalChannelFactory")
            .field("network", &self.network)
            .field("hash_algorithms", &self.hash_algorithms)
            .finish_non_exhaustive()
    }
}

impl ChannelFactory for LocalChannelFactory {
    fn connect(
        &self,
        address: &ServerAddress,
    ) -> Result<Box<dyn AssertionGeneratorClient>, AssertionError> {
        let generator = self
            .network
            .lookup(address)
            .map_err(into_transport)?
            .ok_or_else(|| {
                AssertionError::transport(format!("no assertion generator listening at {address}"))
            })?;

        let session = self.handshake(&generator).map_err(into_transport)?;
        Ok(Box::new(LocalClient { session }))
    }
}

struct LocalClient {
    session: Session,
}

impl AssertionGeneratorClient for LocalClient {
    fn generate_remote_assertion(
        &self,
        user_data: &[u8],
    ) -> Result<RemoteAssertion, AssertionError> {
        self.session
            .generate_remote_assertion(user_data)
            .map_err(into_transport)
    }
}

/// Reports any channel-level failure as a transport error.
///
/// The detail stays in the error's local reason; its public message is fixed.
pub(crate) fn into_transport(err: AssertionError) -> AssertionError {
    match err {
        AssertionError::Transport { .. } => err,
        other => AssertionError::transport(format!("attested channel failed: {other}")),
    }
}
