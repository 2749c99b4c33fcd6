//! Connection acceptor and per-request worker.
//!
//! One detached worker thread per accepted connection; a worker serves a
//! single request and closes the socket. There is no error frame: every
//! protocol, crypto, session, or file-system failure is expressed by
//! closing the connection without a response, so failing paths simply
//! return.

use std::collections::HashMap;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use blockfs::manager::fs::BlockFs;
use blockfs::typ::request::Op;
use log::{debug, warn};

use crate::crypto;
use crate::session::SessionTable;
use crate::wire;

/// Everything a worker needs, threaded through explicitly.
pub struct ServerContext {
    pub fs: BlockFs,
    pub sessions: SessionTable,
    /// Populated once at startup, read-only afterwards.
    pub credentials: HashMap<String, String>,
}

/// Accept until the listener dies. Workers are detached; a hung client
/// costs one thread and nothing else.
pub fn run(listener: TcpListener, ctx: Arc<ServerContext>) {
    for connection in listener.incoming() {
        match connection {
            Ok(stream) => {
                let ctx = ctx.clone();
                thread::spawn(move || handle(stream, ctx));
            }
            Err(e) => warn!("accept failed: {}", e),
        }
    }
}

fn handle(mut stream: TcpStream, ctx: Arc<ServerContext>) {
    let Some((user, size)) = wire::read_header(&mut stream) else {
        return;
    };
    // Unknown user fails silently, indistinguishable from a bad password.
    let Some(password) = ctx.credentials.get(&user) else {
        debug!("unknown user {:?}", user);
        return;
    };
    let Some(ciphertext) = wire::read_body(&mut stream, size) else {
        return;
    };
    let Some(clear) = crypto::decrypt(password, &ciphertext) else {
        debug!("undecryptable request from {:?}", user);
        return;
    };
    let Some(request) = wire::parse_request(&user, &clear) else {
        return;
    };

    let session = match request.op {
        Op::Session => {
            // SESSION must claim session zero on the wire
            if request.session != 0 {
                return;
            }
            match ctx.sessions.open(&user, request.sequence) {
                Some(id) => id,
                None => return,
            }
        }
        _ => {
            if !ctx.sessions.validate(&user, request.session, request.sequence) {
                debug!("stale or foreign session from {:?}", user);
                return;
            }
            request.session
        }
    };

    let reply = match ctx.fs.apply(&request) {
        Ok(reply) => reply,
        Err(code) => {
            debug!("request from {:?} failed: {}", user, code);
            return;
        }
    };

    let clear = wire::encode_reply(session, request.sequence, &reply);
    let framed = wire::frame(&crypto::encrypt(password, &clear));
    if let Err(e) = stream.write_all(&framed) {
        debug!("response to {:?} lost: {}", user, e);
    }
}
