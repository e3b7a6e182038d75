//! Unix-socket command server.
//!
//! Binds a Unix stream socket and serves every accepted connection on its
//! own thread.  Each connection is one command sequence: the sequencer lock
//! is taken when the first command envelope arrives and held until the
//! client disconnects.  `PING` is answered without touching the lock.
//!
//! # Wire format
//!
//! See [`codec`](super::codec).  For example, `query layout` is sent as
//!
//! ```text
//! QUERY\0 1\0 layout\0          (without the spaces)
//! ```
//!
//! and answered with `OK\0 1\0 vertical\0` or `ERR\0 1\0 <message>\0`.

use super::codec::{self, CodecError, Message, RecordReader, PING};
use super::TransportError;
use crate::command::Command;
use crate::registry;
use crate::sequencer::{Sequence, Sequencer};
use log::{debug, error, info, warn};
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread;

/// A bound control socket.  The socket file is removed on drop.
pub struct SocketServer {
    path: PathBuf,
    listener: UnixListener,
}

impl SocketServer {
    /// Bind `path`, replacing a stale socket file left by a previous run.
    ///
    /// A socket some other process still accepts connections on is not
    /// stale: binding fails with `AddrInUse` and the file is left alone.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            if UnixStream::connect(&path).is_ok() {
                return Err(TransportError::Bind {
                    path,
                    source: io::Error::new(
                        io::ErrorKind::AddrInUse,
                        "another daemon is listening on this socket",
                    ),
                });
            }
            debug!("removing stale socket {}", path.display());
            let _ = std::fs::remove_file(&path);
        }
        let listener = UnixListener::bind(&path).map_err(|source| TransportError::Bind {
            path: path.clone(),
            source,
        })?;
        info!("listening on {}", path.display());
        Ok(Self { path, listener })
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections forever.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    pub fn serve(&self, sequencer: Sequencer) {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let sequencer = sequencer.clone();
                    thread::spawn(move || {
                        debug!("client connected");
                        if let Err(e) = handle_connection(stream, &sequencer) {
                            warn!("connection error: {}", e);
                        }
                        debug!("client disconnected");
                    });
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn handle_connection(stream: UnixStream, sequencer: &Sequencer) -> Result<(), TransportError> {
    let mut writer = stream.try_clone()?;
    let mut reader = RecordReader::new(stream);
    let mut sequence: Option<Sequence<'_>> = None;

    loop {
        let message = match reader.read_message() {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(()),
            Err(e @ CodecError::RecordTooLong) => {
                let _ = codec::write_message(&mut writer, &Message::err(e.to_string()));
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        debug!("received {}", message);

        let reply = if message.kind == PING {
            Message::pong()
        } else {
            match registry::kind_from_wire(&message.kind) {
                Err(e) => Message::err(e.to_string()),
                Ok(kind) => match message.args.split_first() {
                    None => Message::err("missing command name"),
                    Some((name, args)) => {
                        let command = Command::new(kind, name.as_str(), args.to_vec());
                        let current = match sequence.take() {
                            Some(current) => current,
                            None => sequencer.begin()?,
                        };
                        match sequence.insert(current).execute(command)? {
                            Ok(messages) => Message::ok(messages),
                            Err(e) => Message::err(e.to_string()),
                        }
                    }
                },
            }
        };
        codec::write_message(&mut writer, &reply)?;
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandContext, CommandKind, CommandResult};
    use crate::ipc::client::Client;
    use crate::registry::CommandError;
    use crate::sequencer::{Event, Executor};
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    /// Monotonic counter to generate unique socket paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("zentile-test-{}-{}.sock", std::process::id(), id))
    }

    /// Echoes each command and its target workspace.
    struct EchoExecutor;

    impl Executor for EchoExecutor {
        fn begin(&mut self) -> CommandContext {
            CommandContext::live(None, 0)
        }

        fn execute(&mut self, ctx: &mut CommandContext, command: &Command) -> CommandResult {
            if command.name == "fail" {
                return Err(CommandError::CommandNotExists {
                    kind: command.kind,
                    name: command.name.clone(),
                });
            }
            if command.kind == CommandKind::For {
                ctx.target_workspace = command.args[0].parse().unwrap_or(0);
            }
            Ok(vec![command.to_string(), ctx.target_workspace.to_string()])
        }
    }

    /// Start a consumer and a server; returns the socket path and a
    /// sequencer sharing the server's lock.
    fn start_server() -> (PathBuf, Sequencer) {
        let (tx, rx) = mpsc::channel::<Event>();
        thread::spawn(move || {
            let mut executor = EchoExecutor;
            for event in rx {
                if let Event::Request(request) = event {
                    request.serve(&mut executor);
                }
            }
        });
        let sequencer = Sequencer::new(tx);

        let path = tmp_socket_path();
        let server = SocketServer::bind(&path).expect("bind");
        let for_server = sequencer.clone();
        thread::spawn(move || server.serve(for_server));
        (path, sequencer)
    }

    #[test]
    fn executes_commands_over_socket() {
        let (path, _sequencer) = start_server();
        let mut client = Client::connect(&path).expect("connect");

        let reply = client.execute(&Command::action("tile")).unwrap();
        assert_eq!(reply, Message::ok(vec!["tile".into(), "0".into()]));

        let reply = client.execute(&Command::action("fail")).unwrap();
        assert!(reply.is_err());
        assert_eq!(reply.args, vec!["command does not exist: action fail"]);
    }

    #[test]
    fn context_is_kept_for_the_connection() {
        let (path, _sequencer) = start_server();
        {
            let mut client = Client::connect(&path).expect("connect");
            let set = Command::new(CommandKind::For, "workspace", vec!["4".into()]);
            client.execute(&set).unwrap();
            let reply = client.execute(&Command::action("tile")).unwrap();
            assert_eq!(reply.args[1], "4");
        }
        let mut client = Client::connect(&path).expect("connect");
        let reply = client.execute(&Command::action("tile")).unwrap();
        assert_eq!(reply.args[1], "0");
    }

    #[test]
    fn ping_does_not_wait_for_the_lock() {
        let (path, sequencer) = start_server();
        let _held = sequencer.begin().unwrap();
        let mut client = Client::connect(&path).expect("connect");
        assert!(client.ping().unwrap());
    }

    #[test]
    fn connection_holds_the_lock_until_it_closes() {
        let (path, _sequencer) = start_server();
        let mut first = Client::connect(&path).expect("connect");
        first.execute(&Command::action("tile")).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let second_path = path.clone();
        thread::spawn(move || {
            let mut second = Client::connect(&second_path).expect("connect");
            let reply = second.execute(&Command::action("untile"));
            let _ = done_tx.send(reply.is_ok());
        });

        thread::sleep(Duration::from_millis(150));
        assert!(done_rx.try_recv().is_err(), "second connection ran while first was open");

        drop(first);
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    }

    #[test]
    fn bad_envelopes_get_err_and_keep_connection() {
        let (path, _sequencer) = start_server();
        let mut client = Client::connect(&path).expect("connect");

        let reply = client.request(&Message::new("DELETE", vec!["x".into()])).unwrap();
        assert_eq!(reply, Message::err("unknown command type \"DELETE\""));

        let reply = client.request(&Message::new("ACTION", vec![])).unwrap();
        assert_eq!(reply, Message::err("missing command name"));

        assert!(client.ping().unwrap());
    }

    #[test]
    fn too_long_record_closes_connection() {
        let (path, _sequencer) = start_server();
        let mut stream = UnixStream::connect(&path).expect("connect");
        stream.write_all(&vec![b'x'; 2048]).unwrap();
        stream.write_all(&[0]).unwrap();

        let mut reader = RecordReader::new(stream);
        let reply = reader.read_message().unwrap().unwrap();
        assert!(reply.is_err());
        assert!(matches!(reader.read_message(), Ok(None) | Err(_)));
    }

    #[test]
    fn stale_socket_file_is_replaced() {
        let path = tmp_socket_path();
        std::fs::write(&path, b"stale").unwrap();
        let server = SocketServer::bind(&path).expect("bind over stale file");
        assert_eq!(server.path(), path.as_path());
        drop(server);
        assert!(!path.exists());
    }

    #[test]
    fn live_socket_is_not_taken_over() {
        let path = tmp_socket_path();
        let first = SocketServer::bind(&path).unwrap();
        match SocketServer::bind(&path) {
            Err(TransportError::Bind { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::AddrInUse);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("second bind succeeded"),
        }
        assert!(path.exists());
        assert!(UnixStream::connect(&path).is_ok());
        drop(first);
        assert!(!path.exists());
    }
}
