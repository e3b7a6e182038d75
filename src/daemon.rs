//! The long-running daemon: one consumer thread that owns the [`Tiler`] and
//! drains the mailbox shared by the socket server, the window-system event
//! source and triggered key chords.

use crate::config::Config;
use crate::ipc::listener::SocketServer;
use crate::keybinding::Keymap;
use crate::sequencer::{Event, Sequencer};
use crate::tiler::Tiler;
use crate::traits::{EventSource, WindowEvent, WindowSystem};
use log::{debug, error, info, warn};
use std::sync::mpsc::{self, Receiver};
use std::thread;

pub struct Daemon<W: WindowSystem> {
    tiler: Tiler<W>,
    keymap: Keymap,
    sequencer: Sequencer,
    mailbox: Receiver<Event>,
}

impl<W: WindowSystem> Daemon<W> {
    /// Build the workspaces, track existing clients and register the
    /// configured keybindings.
    pub fn new(wm: W, config: &Config) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut tiler = Tiler::new(wm, config.tiler_options());
        if let Err(e) = tiler.populate() {
            warn!("failed to list existing clients: {}", e);
        }
        let keymap = Keymap::parse(&config.keybindings);
        if keymap.is_empty() {
            info!("no keybindings configured");
        } else {
            keymap.register(tiler.wm());
        }
        Self {
            tiler,
            keymap,
            sequencer: Sequencer::new(tx),
            mailbox: rx,
        }
    }

    pub fn tiler(&self) -> &Tiler<W> {
        &self.tiler
    }

    pub fn sequencer(&self) -> Sequencer {
        self.sequencer.clone()
    }

    /// Serve `server` on a background thread.
    pub fn spawn_server(&self, server: SocketServer) {
        let sequencer = self.sequencer();
        thread::spawn(move || server.serve(sequencer));
    }

    /// Run `source` on a background thread, feeding this daemon's mailbox.
    pub fn spawn_source<S: EventSource + 'static>(&self, mut source: S) {
        let sink = self.sequencer.mailbox();
        thread::spawn(move || {
            if let Err(e) = source.run(sink) {
                error!("event source error: {}", e);
            }
        });
    }

    /// React to one event on the consumer thread.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Request(request) => request.serve(&mut self.tiler),
            Event::Window(WindowEvent::KeyChord(chord)) => self.run_chord(&chord),
            Event::Window(event) => self.tiler.handle_window_event(event),
        }
    }

    /// Run the bound sequence on a fresh producer thread.  The consumer must
    /// not block here: the sequence needs it to serve its requests.
    fn run_chord(&self, chord: &str) {
        let Some(commands) = self.keymap.get(chord) else {
            debug!("no binding for {}", chord);
            return;
        };
        let commands = commands.to_vec();
        let sequencer = self.sequencer();
        let chord = chord.to_string();
        thread::spawn(move || match sequencer.run(&commands) {
            Ok(results) => {
                for (command, result) in commands.iter().zip(results) {
                    if let Err(e) = result {
                        warn!("{}: {}: {}", chord, command, e);
                    }
                }
            }
            Err(e) => error!("{}: {}", chord, e),
        });
    }

    /// Drain the mailbox on the calling thread.
    ///
    /// The daemon keeps a handle on its own mailbox for key chords, so this
    /// only returns if receiving fails.
    pub fn run(mut self) {
        info!("zentile running");
        while let Ok(event) = self.mailbox.recv() {
            self.handle(event);
        }
        info!("mailbox closed, exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ClientId, Command, CommandKind};
    use crate::traits::{Arrangement, ClientInfo};
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Shares its call log with the test, since the daemon owns the wm.
    #[derive(Debug, Default, Clone)]
    struct SharedWm {
        bound: Arc<Mutex<Vec<String>>>,
        arranged: Arc<Mutex<Vec<usize>>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("shared wm error")]
    struct SharedErr;

    impl WindowSystem for SharedWm {
        type Error = SharedErr;

        fn active_client(&self) -> Result<Option<ClientId>, SharedErr> {
            Ok(Some(ClientId(1)))
        }

        fn current_workspace(&self) -> Result<usize, SharedErr> {
            Ok(0)
        }

        fn workspace_count(&self) -> usize {
            2
        }

        fn clients(&self) -> Result<Vec<ClientInfo>, SharedErr> {
            Ok(vec![ClientInfo {
                id: ClientId(1),
                workspace: 0,
                class: "kitty".into(),
            }])
        }

        fn bind_key(&self, chord: &str) -> Result<(), SharedErr> {
            self.bound.lock().unwrap().push(chord.to_string());
            Ok(())
        }

        fn focus(&self, _client: ClientId) -> Result<(), SharedErr> {
            Ok(())
        }

        fn arrange(&self, ws: usize, _a: &Arrangement<'_>) -> Result<(), SharedErr> {
            self.arranged.lock().unwrap().push(ws);
            Ok(())
        }

        fn release(&self, _ws: usize, _clients: &[ClientId]) -> Result<(), SharedErr> {
            Ok(())
        }
    }

    fn make_daemon(bindings: &[(&str, &str)]) -> (Daemon<SharedWm>, SharedWm) {
        let wm = SharedWm::default();
        let config = Config {
            keybindings: bindings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            ..Config::default()
        };
        (Daemon::new(wm.clone(), &config), wm)
    }

    /// Handle the next `n` events, failing if they do not arrive.
    fn pump(daemon: &mut Daemon<SharedWm>, n: usize) {
        for _ in 0..n {
            let event = daemon
                .mailbox
                .recv_timeout(Duration::from_secs(5))
                .expect("event");
            daemon.handle(event);
        }
    }

    #[test]
    fn startup_populates_and_binds() {
        let (daemon, wm) = make_daemon(&[("Control-Shift-t", "tile"), ("Control-x", "nope")]);
        assert_eq!(*wm.bound.lock().unwrap(), vec!["Control-Shift-t".to_string()]);
        assert!(daemon.tiler().workspace(0).unwrap().contains(ClientId(1)));
    }

    #[test]
    fn empty_keymap_binds_nothing() {
        let (daemon, wm) = make_daemon(&[]);
        assert!(daemon.keymap.is_empty());
        assert!(wm.bound.lock().unwrap().is_empty());
    }

    #[test]
    fn key_chord_runs_bound_sequence() {
        let (mut daemon, wm) = make_daemon(&[("Control-Shift-w", "for workspace 1, tile")]);
        daemon.handle(Event::Window(WindowEvent::KeyChord("Control-Shift-w".into())));
        // begin + two commands
        pump(&mut daemon, 3);
        assert!(daemon.tiler().workspace(1).unwrap().is_tiling());
        assert!(!daemon.tiler().workspace(0).unwrap().is_tiling());
        assert_eq!(*wm.arranged.lock().unwrap(), vec![1]);
    }

    #[test]
    fn unbound_chord_is_ignored() {
        let (mut daemon, _wm) = make_daemon(&[]);
        daemon.handle(Event::Window(WindowEvent::KeyChord("Control-q".into())));
        assert!(daemon
            .mailbox
            .recv_timeout(Duration::from_millis(100))
            .is_err());
    }

    #[test]
    fn producer_requests_are_served() {
        let (mut daemon, _wm) = make_daemon(&[]);
        let sequencer = daemon.sequencer();
        let producer = thread::spawn(move || {
            sequencer
                .run(&[
                    Command::action("tile"),
                    Command::new(CommandKind::Query, "layout", vec![]),
                ])
                .unwrap()
        });
        pump(&mut daemon, 3);
        let results = producer.join().unwrap();
        assert_eq!(results[1], Ok(vec!["vertical".to_string()]));
    }

    #[test]
    fn window_events_reach_the_tiler() {
        let (mut daemon, _wm) = make_daemon(&[]);
        daemon.handle(Event::Window(WindowEvent::Opened {
            client: ClientId(9),
            workspace: 1,
            class: "kitty".into(),
        }));
        assert!(daemon.tiler().workspace(1).unwrap().contains(ClientId(9)));
    }
}
