//! Per-connection TOC handling: handshake, sign-on, and the three-task
//! group.
//!
//! After the `FLAPON` handshake and a rate-limit check, the first data
//! frame must carry `toc_signon`. A signed-on connection then runs three
//! cooperating loops selected into one fate-sharing group:
//!
//! - the **reader** parses FLAP frames and dispatches commands,
//! - the **backend listener** drains the BOS session and translates events,
//! - the **writer** drains the outbound queue into data frames.
//!
//! The first loop to return — success or error — collapses the group; the
//! other two are dropped, which aborts their pending I/O. Expected
//! terminations (client signoff, rate-limit rejection, failed sign-on)
//! return `Ok`; everything else surfaces as a [`ConnectionError`] naming
//! the side that failed.

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tocgate_proto::{
    FlapFrameType, FlapReader, FlapWriter,
    tlv::TlvRestBlock,
};

use crate::{
    args::split_verb,
    chat_registry::ChatRegistry,
    error::{ConnectionError, SessionEnd},
    events::{translate_bos_event, trim_trailing_nuls},
    rate_limit::SignonLimiter,
    translator::{CommandTranslator, ConnContext},
};

/// Largest inbound TOC data payload, after trailing-NUL stripping.
pub const MAX_TOC_FRAME: usize = 2048;

/// Outbound line-queue depth. Capacity one serializes the two producers by
/// back-pressure, preserving each source's order.
const REPLY_QUEUE_DEPTH: usize = 1;

/// Drive one TOC connection to completion.
///
/// `stream` is positioned at the very first client byte (the `FLAPON`
/// literal). Returns when the connection is over; the socket closes when
/// the stream drops.
pub async fn handle_toc_connection<S>(
    translator: Arc<CommandTranslator>,
    limiter: &SignonLimiter,
    stream: S,
    peer: SocketAddr,
    cancel: CancellationToken,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FlapReader::new(read_half);
    let mut writer = FlapWriter::new(write_half);

    // Handshake and sign-on, raced against server shutdown. `Ok(None)`
    // covers the expected pre-session terminations.
    let setup = async {
        reader.expect_flapon().await.map_err(ConnectionError::ClientRead)?;
        writer
            .send_signon_frame(TlvRestBlock::default())
            .await
            .map_err(ConnectionError::ServerWrite)?;
        let _client_signon =
            reader.receive_signon_frame().await.map_err(ConnectionError::ClientRead)?;

        if !limiter.allow(peer.ip()) {
            tracing::info!(%peer, "sign-on rate limited");
            let _ = writer.send_data_frame(b"ERROR:983").await;
            return Ok(None);
        }

        // The first data frame must be the sign-on command.
        let (frame_type, payload) =
            reader.receive_frame().await.map_err(ConnectionError::ClientRead)?;
        if frame_type != FlapFrameType::Data {
            return Err(ConnectionError::TocProcessing(SessionEnd::EmptyFrame));
        }
        let payload = trim_trailing_nuls(&payload).to_vec();
        let text = String::from_utf8_lossy(&payload);
        let (verb, arguments) = split_verb(text.trim_end_matches(['\r', '\n']));
        if verb != "toc_signon" {
            tracing::info!(%peer, verb, "first command was not toc_signon");
            let _ = writer.send_data_frame(b"ERROR:980").await;
            return Ok(None);
        }

        let outcome = match translator.signon(arguments, peer).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                tracing::info!(%peer, error = %failure, "sign-on rejected");
                let _ = writer.send_data_frame(failure.line().as_bytes()).await;
                return Ok(None);
            },
        };
        for line in &outcome.lines {
            writer
                .send_data_frame(line.as_bytes())
                .await
                .map_err(ConnectionError::ServerWrite)?;
        }
        Ok(Some(outcome.sess))
    };

    let signed_on = tokio::select! {
        () = cancel.cancelled() => return Ok(()),
        result = setup => result?,
    };
    let Some(sess) = signed_on else {
        return Ok(());
    };
    let chats = Arc::new(ChatRegistry::new());
    let conn_cancel = cancel.child_token();

    let result =
        run_session(&translator, &sess, &chats, reader, writer, conn_cancel.clone()).await;

    // Teardown: tell watchers we left, then unwind backend state. The
    // cancel stops every chat relay first.
    conn_cancel.cancel();
    let services = translator.services();
    if let Err(err) = services.buddy.broadcast_buddy_departed(&sess).await {
        tracing::warn!(error = %err, "departed broadcast failed");
    }
    if let Err(err) = services.buddy_list.unregister_buddy_list(&sess.screen_name()).await {
        tracing::warn!(error = %err, "buddy list unregister failed");
    }
    services.auth.signout(&sess).await;
    for (chat_id, chat_sess) in chats.sessions() {
        services.auth.signout_chat(&chat_sess).await;
        chat_sess.close();
        chats.remove_session(chat_id);
    }
    sess.close();

    match &result {
        Ok(()) => tracing::info!(%peer, "TOC connection closed"),
        Err(err) => tracing::info!(%peer, error = %err, "TOC connection ended"),
    }
    result
}

/// The fate-sharing group of a signed-on connection.
async fn run_session<R, W>(
    translator: &CommandTranslator,
    sess: &Arc<tocgate_core::Session>,
    chats: &Arc<ChatRegistry>,
    mut reader: FlapReader<R>,
    mut writer: FlapWriter<W>,
    cancel: CancellationToken,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(REPLY_QUEUE_DEPTH);
    let event_tx = reply_tx.clone();
    let ctx = ConnContext {
        sess: Arc::clone(sess),
        chats: Arc::clone(chats),
        reply_tx,
        cancel: cancel.clone(),
    };

    let read_loop = async {
        loop {
            let frame = tokio::select! {
                () = cancel.cancelled() => {
                    return Err(ConnectionError::TocProcessing(SessionEnd::Shutdown));
                },
                frame = reader.receive_frame() => {
                    frame.map_err(ConnectionError::ClientRead)?
                },
            };
            match frame {
                (FlapFrameType::SignOff, _) => return Ok(()),
                (FlapFrameType::KeepAlive, _) => {
                    tracing::trace!("keep-alive");
                },
                (FlapFrameType::SignOn | FlapFrameType::Error, _) => {
                    tracing::debug!("ignoring out-of-band FLAP frame");
                },
                (FlapFrameType::Data, payload) => {
                    let payload = trim_trailing_nuls(&payload);
                    if payload.is_empty() {
                        return Err(ConnectionError::TocProcessing(SessionEnd::EmptyFrame));
                    }
                    if payload.len() > MAX_TOC_FRAME {
                        return Err(ConnectionError::TocProcessing(SessionEnd::FrameTooLong {
                            len: payload.len(),
                            max: MAX_TOC_FRAME,
                        }));
                    }
                    let text = String::from_utf8_lossy(payload).into_owned();
                    let reply = translator.handle_command(&ctx, text.trim_end_matches(['\r', '\n'])).await;
                    if !reply.is_empty() && ctx.reply_tx.send(reply).await.is_err() {
                        return Err(ConnectionError::TocProcessing(SessionEnd::QueueClosed));
                    }
                },
            }
        }
    };

    let backend_loop = async {
        loop {
            let msg = tokio::select! {
                () = cancel.cancelled() => {
                    return Err(ConnectionError::TocProcessing(SessionEnd::Shutdown));
                },
                () = sess.closed() => {
                    return Err(ConnectionError::TocProcessing(SessionEnd::Disconnect));
                },
                msg = sess.recv_message() => match msg {
                    Some(msg) => msg,
                    None => return Err(ConnectionError::TocProcessing(SessionEnd::Disconnect)),
                },
            };
            if let Some(line) = translate_bos_event(chats, &msg) {
                let sent = tokio::select! {
                    () = cancel.cancelled() => {
                        return Err(ConnectionError::TocProcessing(SessionEnd::Shutdown));
                    },
                    sent = event_tx.send(line) => sent,
                };
                if sent.is_err() {
                    return Err(ConnectionError::TocProcessing(SessionEnd::QueueClosed));
                }
            }
        }
    };

    let write_loop = async {
        loop {
            let line = tokio::select! {
                () = cancel.cancelled() => {
                    return Err(ConnectionError::TocProcessing(SessionEnd::Shutdown));
                },
                line = reply_rx.recv() => line,
            };
            match line {
                Some(line) => {
                    writer
                        .send_data_frame(line.as_bytes())
                        .await
                        .map_err(ConnectionError::ServerWrite)?;
                },
                None => return Ok(()),
            }
        }
    };

    // First finisher wins; the other loops are dropped, which cancels
    // their pending reads and writes.
    tokio::select! {
        result = read_loop => result,
        result = backend_loop => result,
        result = write_loop => result,
    }
}
