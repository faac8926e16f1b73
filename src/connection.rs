use std::time::Duration;

use commonsfish_core::{
    decode_server_msg, encode, parse_display_name, parse_observer_pin, server_msg_kind, ClientMsg,
    CodecError, PlayerId, RoomCode, RoomSnapshot, ServerMsg,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::observer::ObserverConsumer;
use crate::round_sync::RoundSynchronizer;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SocketSink = SplitSink<Socket, Message>;

pub type EventReceiver<E> = mpsc::Receiver<ConnectionEvent<E>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Handshaking,
    Synced,
}

impl LinkState {
    pub fn is_online(self) -> bool {
        self == LinkState::Synced
    }

    pub fn label(self) -> &'static str {
        match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Handshaking => "handshaking",
            LinkState::Synced => "synced",
        }
    }
}

/// The one message sent on every fresh channel. Replayed unchanged on
/// reconnect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handshake {
    Join { room: RoomCode, name: String },
    Observe { room: RoomCode, pin: String },
}

impl Handshake {
    pub fn join(room: &str, name: &str) -> Result<Self> {
        Ok(Handshake::Join {
            room: RoomCode::parse(room)?,
            name: parse_display_name(name)?,
        })
    }

    pub fn observe(room: &str, pin: &str) -> Result<Self> {
        Ok(Handshake::Observe {
            room: RoomCode::parse(room)?,
            pin: parse_observer_pin(pin)?,
        })
    }

    pub fn room(&self) -> &RoomCode {
        match self {
            Handshake::Join { room, .. } | Handshake::Observe { room, .. } => room,
        }
    }

    pub fn message(&self) -> ClientMsg {
        match self {
            Handshake::Join { room, name } => ClientMsg::Join {
                room_code: room.to_string(),
                name: name.clone(),
            },
            Handshake::Observe { room, pin } => ClientMsg::Observe {
                room_code: room.to_string(),
                pin: pin.clone(),
            },
        }
    }
}

/// What a consumer wants done after handling a command.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOutput<E> {
    pub outbound: Option<ClientMsg>,
    pub event: Option<E>,
}

impl<E> CommandOutput<E> {
    pub fn none() -> Self {
        Self {
            outbound: None,
            event: None,
        }
    }

    pub fn event(event: E) -> Self {
        Self {
            outbound: None,
            event: Some(event),
        }
    }
}

/// Session-side half of a connection. Lives in the driver task for the
/// whole logical session, across any number of transports.
pub trait RoomConsumer: Send + 'static {
    type Command: Send + 'static;
    type Event: Send + 'static;

    fn acknowledged(&mut self, _player_id: Option<PlayerId>) {}

    fn consume(&mut self, snapshot: RoomSnapshot) -> Option<Self::Event>;

    /// `online` is false whenever the link is not `Synced`.
    fn command(&mut self, command: Self::Command, online: bool) -> CommandOutput<Self::Event>;

    /// Called when an outbound message from `command` could not be written.
    /// Returns the event to emit in place of the one `command` produced.
    fn outbound_failed(&mut self, _message: ClientMsg) -> Option<Self::Event> {
        None
    }

    fn transport_lost(&mut self) -> Option<Self::Event> {
        None
    }
}

/// Picks the event to emit once the outbound half of a command has been
/// attempted. A failed write hands the message back to the consumer.
fn settle_command<C: RoomConsumer>(
    consumer: &mut C,
    output: CommandOutput<C::Event>,
    sent: Result<()>,
) -> Option<C::Event> {
    match (output.outbound, sent) {
        (Some(message), Err(err)) => {
            warn!(error = %err, kind = ?message, "outbound message not delivered");
            consumer.outbound_failed(message)
        }
        _ => output.event,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionEvent<E> {
    Link(LinkState),
    Acknowledged { player_id: Option<PlayerId> },
    Session(E),
    /// Coordinator error text or a dropped malformed snapshot. Not fatal.
    Advisory(String),
    Reconnecting { attempt: u32, delay: Duration },
    GaveUp { attempts: u32 },
    Stopped,
}

enum Control<C> {
    Command(C),
    Shutdown,
}

/// Handle to a running driver task. Dropping it stops the task.
pub struct ConnectionHandle<C: RoomConsumer> {
    control: mpsc::UnboundedSender<Control<C::Command>>,
    task: JoinHandle<C>,
}

impl<C: RoomConsumer> ConnectionHandle<C> {
    pub fn send(&self, command: C::Command) -> Result<()> {
        self.control
            .send(Control::Command(command))
            .map_err(|_| ClientError::Stopped)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Closes the channel and hands back the consumer with its session.
    pub async fn shutdown(self) -> Option<C> {
        let _ = self.control.send(Control::Shutdown);
        self.task.await.ok()
    }
}

pub struct ConnectionManager;

impl ConnectionManager {
    /// Spawns the driver task. Must be called inside a tokio runtime.
    pub fn start<C: RoomConsumer>(
        config: ClientConfig,
        handshake: Handshake,
        consumer: C,
    ) -> (ConnectionHandle<C>, EventReceiver<C::Event>) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let driver = Driver {
            config,
            handshake,
            consumer,
            control: control_rx,
            events: events_tx,
            link: LinkState::Disconnected,
        };
        let task = tokio::spawn(driver.run());
        (
            ConnectionHandle {
                control: control_tx,
                task,
            },
            events_rx,
        )
    }

    pub fn join(
        config: ClientConfig,
        room: &str,
        name: &str,
    ) -> Result<(
        ConnectionHandle<RoundSynchronizer>,
        EventReceiver<<RoundSynchronizer as RoomConsumer>::Event>,
    )> {
        let handshake = Handshake::join(room, name)?;
        let consumer = RoundSynchronizer::new(config.board());
        Ok(Self::start(config, handshake, consumer))
    }

    pub fn observe(
        config: ClientConfig,
        room: &str,
        pin: &str,
    ) -> Result<(
        ConnectionHandle<ObserverConsumer>,
        EventReceiver<<ObserverConsumer as RoomConsumer>::Event>,
    )> {
        let handshake = Handshake::observe(room, pin)?;
        Ok(Self::start(config, handshake, ObserverConsumer::new()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Exit {
    Closed,
    Stop,
}

struct Driver<C: RoomConsumer> {
    config: ClientConfig,
    handshake: Handshake,
    consumer: C,
    control: mpsc::UnboundedReceiver<Control<C::Command>>,
    events: mpsc::Sender<ConnectionEvent<C::Event>>,
    link: LinkState,
}

impl<C: RoomConsumer> Driver<C> {
    async fn run(mut self) -> C {
        let mut attempts: u32 = 0;
        loop {
            self.set_link(LinkState::Connecting).await;
            let exit = match tokio_tungstenite::connect_async(self.config.ws_url.as_str()).await {
                Ok((socket, _response)) => {
                    info!(url = %self.config.ws_url, "channel open");
                    self.drive(socket, &mut attempts).await
                }
                Err(err) => {
                    warn!(url = %self.config.ws_url, error = %err, "connect failed");
                    Exit::Closed
                }
            };
            if exit == Exit::Stop {
                break;
            }

            if let Some(event) = self.consumer.transport_lost() {
                self.emit(ConnectionEvent::Session(event)).await;
            }
            self.set_link(LinkState::Disconnected).await;

            attempts = attempts.saturating_add(1);
            if self
                .config
                .max_reconnect_attempts
                .is_some_and(|max| attempts > max)
            {
                let attempts = attempts - 1;
                warn!(attempts, "giving up on reconnect");
                self.emit(ConnectionEvent::GaveUp { attempts }).await;
                break;
            }
            let delay = self.config.reconnect_delay;
            info!(attempt = attempts, delay_ms = delay.as_millis() as u64, "reconnecting");
            self.emit(ConnectionEvent::Reconnecting {
                attempt: attempts,
                delay,
            })
            .await;
            if !self.wait(delay).await {
                break;
            }
        }
        self.set_link(LinkState::Disconnected).await;
        self.emit(ConnectionEvent::Stopped).await;
        self.consumer
    }

    async fn drive(&mut self, socket: Socket, attempts: &mut u32) -> Exit {
        let (mut write, mut read) = socket.split();
        self.set_link(LinkState::Handshaking).await;
        let hello = self.handshake.message();
        if let Err(err) = send_msg(&mut write, &hello).await {
            warn!(error = %err, "handshake send failed");
            return Exit::Closed;
        }
        info!(room = %self.handshake.room(), "handshake sent");

        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.inbound(text.as_str(), attempts).await,
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => self.inbound(text, attempts).await,
                        Err(err) => warn!(error = %err, "non-utf8 frame ignored"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "channel closed by coordinator");
                        return Exit::Closed;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "transport error");
                        return Exit::Closed;
                    }
                    None => {
                        info!("channel ended");
                        return Exit::Closed;
                    }
                },
                control = self.control.recv() => match control {
                    Some(Control::Command(command)) => {
                        let output = self.consumer.command(command, self.link.is_online());
                        let sent = match &output.outbound {
                            Some(message) => send_msg(&mut write, message).await,
                            None => Ok(()),
                        };
                        let failed = sent.is_err();
                        if let Some(event) = settle_command(&mut self.consumer, output, sent) {
                            self.emit(ConnectionEvent::Session(event)).await;
                        }
                        if failed {
                            return Exit::Closed;
                        }
                    }
                    Some(Control::Shutdown) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        info!("connection shut down");
                        return Exit::Stop;
                    }
                },
            }
        }
    }

    async fn inbound(&mut self, text: &str, attempts: &mut u32) {
        let message = match decode_server_msg(text) {
            Ok(message) => message,
            Err(CodecError::UnknownType(kind)) => {
                debug!(%kind, "unknown message type ignored");
                return;
            }
            Err(err) if err.is_advisory() => {
                warn!(error = %err, "malformed snapshot dropped");
                self.emit(ConnectionEvent::Advisory(err.to_string())).await;
                return;
            }
            Err(err) => {
                warn!(error = %err, "undecodable message ignored");
                return;
            }
        };
        debug!(kind = server_msg_kind(&message), link = self.link.label(), "message received");
        match message {
            ServerMsg::Joined { player_id } => self.acknowledge(player_id, attempts).await,
            ServerMsg::Observing { room_code } => {
                debug!(?room_code, "observing acknowledged");
                self.acknowledge(None, attempts).await;
            }
            ServerMsg::State { state } => {
                if self.link != LinkState::Synced {
                    self.acknowledge(None, attempts).await;
                }
                if let Some(event) = self.consumer.consume(state) {
                    self.emit(ConnectionEvent::Session(event)).await;
                }
            }
            ServerMsg::Error { message } => {
                warn!(%message, "coordinator error");
                self.emit(ConnectionEvent::Advisory(message)).await;
            }
        }
    }

    async fn acknowledge(&mut self, player_id: Option<PlayerId>, attempts: &mut u32) {
        self.consumer.acknowledged(player_id.clone());
        *attempts = 0;
        if self.link == LinkState::Synced {
            return;
        }
        info!(room = %self.handshake.room(), player_id = ?player_id, "handshake acknowledged");
        self.set_link(LinkState::Synced).await;
        self.emit(ConnectionEvent::Acknowledged { player_id }).await;
    }

    /// Sleeps out the reconnect delay while still serving commands offline.
    /// Returns false on shutdown.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return true,
                control = self.control.recv() => match control {
                    Some(Control::Command(command)) => {
                        let output = self.consumer.command(command, false);
                        let sent = match output.outbound {
                            Some(_) => Err(ClientError::NotConnected),
                            None => Ok(()),
                        };
                        if let Some(event) = settle_command(&mut self.consumer, output, sent) {
                            self.emit(ConnectionEvent::Session(event)).await;
                        }
                    }
                    Some(Control::Shutdown) | None => return false,
                },
            }
        }
    }

    async fn set_link(&mut self, link: LinkState) {
        if self.link == link {
            return;
        }
        debug!(from = self.link.label(), to = link.label(), "link state");
        self.link = link;
        self.emit(ConnectionEvent::Link(link)).await;
    }

    async fn emit(&mut self, event: ConnectionEvent<C::Event>) {
        if self.events.send(event).await.is_err() {
            debug!("event receiver dropped");
        }
    }
}

async fn send_msg(write: &mut SocketSink, message: &ClientMsg) -> Result<()> {
    let payload = encode(message)?;
    write.send(Message::text(payload)).await?;
    Ok(())
}
