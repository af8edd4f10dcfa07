// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! ZooKeeper session bootstrap and the [`TreeClient`] adapter

use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use diagnostics::{log_debug, log_info, log_warn};
use zookeeper::{Permission, Stat, WatchedEvent, ZkError, ZkState, ZooKeeper};
use zksnap::{Acl, ClientError, ClientResult, CreateMode, Identity, NodeStat, Perms, TreeClient};

use crate::cli::CommonArgs;

/// A connected ZooKeeper session
pub struct ZkTreeClient {
    zk: ZooKeeper,
}

impl ZkTreeClient {
    /// Open a session and wait until it is connected
    ///
    /// Session state changes arrive through a listener, not the watcher; the
    /// watcher only sees node notifications and is used for debug logging.
    /// Fails when the session is not connected within the connect timeout.
    pub fn connect(args: &CommonArgs) -> Result<Self> {
        let watcher = |event: WatchedEvent| {
            let state = format!("{:?}", event.keeper_state);
            let path = event.path.unwrap_or_default();
            log_debug!(
                "ZooKeeper event {state} on {path}",
                state: state.as_str(),
                path: path.as_str()
            );
        };

        let zk = ZooKeeper::connect(
            &args.zk_connect,
            Duration::from_millis(args.session_timeout),
            watcher,
        )
        .map_err(|e| anyhow!("Failed to connect to {}: {:?}", args.zk_connect, e))?;

        let (tx, rx) = mpsc::channel();
        let _ = zk.add_listener(move |state: ZkState| {
            let _ = tx.send(state);
        });

        if let Err(err) = wait_connected(&rx, Duration::from_millis(args.connect_timeout)) {
            let _ = zk.close();
            return Err(err.context(format!("Failed to connect to {}", args.zk_connect)));
        }
        log_info!("Connected to {connect}", connect: args.zk_connect.as_str());
        Ok(Self { zk })
    }

    pub fn close(self) {
        if let Err(err) = self.zk.close() {
            let message = format!("{err:?}");
            log_warn!("Failed to close session: {error}", error: message.as_str());
        }
    }
}

fn wait_connected(states: &Receiver<ZkState>, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match states.recv_timeout(remaining) {
            Ok(ZkState::Connected | ZkState::ConnectedReadOnly) => return Ok(()),
            Ok(ZkState::AuthFailed) => return Err(anyhow!("authentication failed")),
            Ok(ZkState::Closed) => return Err(anyhow!("session closed")),
            Ok(state) => {
                let state = format!("{state:?}");
                log_debug!("Session state {state}", state: state.as_str());
            }
            Err(_) => {
                return Err(anyhow!(
                    "timed out after {} ms",
                    timeout.as_millis()
                ));
            }
        }
    }
}

fn client_error(path: &str, err: ZkError) -> ClientError {
    match err {
        ZkError::NoNode => ClientError::no_node(path),
        ZkError::NodeExists => ClientError::node_exists(path),
        ZkError::BadVersion => ClientError::bad_version(path),
        other => ClientError::remote(path, format!("{other:?}")),
    }
}

fn node_stat(stat: &Stat) -> NodeStat {
    NodeStat {
        czxid: stat.czxid,
        mzxid: stat.mzxid,
        pzxid: stat.pzxid,
        ctime: stat.ctime,
        mtime: stat.mtime,
        version: stat.version,
        cversion: stat.cversion,
        aversion: stat.aversion,
        ephemeral_owner: stat.ephemeral_owner,
        data_length: stat.data_length,
        num_children: stat.num_children,
    }
}

const PERMISSIONS: [(Perms, Permission); 5] = [
    (Perms::READ, Permission::READ),
    (Perms::WRITE, Permission::WRITE),
    (Perms::CREATE, Permission::CREATE),
    (Perms::DELETE, Permission::DELETE),
    (Perms::ADMIN, Permission::ADMIN),
];

fn from_zk_acl(acl: zookeeper::Acl) -> Acl {
    let bits = PERMISSIONS
        .iter()
        .filter(|(_, zk)| acl.perms.can(*zk))
        .fold(0, |bits, (perms, _)| bits | perms.bits());
    Acl::new(Perms(bits), Identity::new(acl.scheme, acl.id))
}

fn to_zk_acl(acl: &Acl) -> zookeeper::Acl {
    let perms = PERMISSIONS
        .iter()
        .filter(|(perms, _)| acl.perms.contains(*perms))
        .fold(Permission::NONE, |all, (_, zk)| all | *zk);
    zookeeper::Acl {
        perms,
        scheme: acl.id.scheme().to_string(),
        id: acl.id.id().to_string(),
    }
}

fn to_zk_acls(acls: &[Acl]) -> Vec<zookeeper::Acl> {
    acls.iter().map(to_zk_acl).collect()
}

impl TreeClient for ZkTreeClient {
    fn get_acl(&self, path: &str) -> ClientResult<(Vec<Acl>, NodeStat)> {
        let (acls, stat) = self.zk.get_acl(path).map_err(|e| client_error(path, e))?;
        Ok((acls.into_iter().map(from_zk_acl).collect(), node_stat(&stat)))
    }

    fn get_data(&self, path: &str) -> ClientResult<(Vec<u8>, NodeStat)> {
        let (data, stat) = self
            .zk
            .get_data(path, false)
            .map_err(|e| client_error(path, e))?;
        Ok((data, node_stat(&stat)))
    }

    fn get_children(&self, path: &str) -> ClientResult<Vec<String>> {
        self.zk
            .get_children(path, false)
            .map_err(|e| client_error(path, e))
    }

    fn create(
        &self,
        path: &str,
        data: Option<&[u8]>,
        acls: &[Acl],
        mode: CreateMode,
    ) -> ClientResult<()> {
        let mode = match mode {
            CreateMode::Persistent => zookeeper::CreateMode::Persistent,
            CreateMode::Ephemeral => zookeeper::CreateMode::Ephemeral,
        };
        let data = data.map(<[u8]>::to_vec).unwrap_or_default();
        self.zk
            .create(path, data, to_zk_acls(acls), mode)
            .map(|_| ())
            .map_err(|e| client_error(path, e))
    }

    fn set_acl(&self, path: &str, acls: &[Acl], version: Option<i32>) -> ClientResult<()> {
        self.zk
            .set_acl(path, to_zk_acls(acls), version)
            .map(|_| ())
            .map_err(|e| client_error(path, e))
    }

    fn set_data(&self, path: &str, data: Option<&[u8]>, version: Option<i32>) -> ClientResult<()> {
        let data = data.map(<[u8]>::to_vec).unwrap_or_default();
        self.zk
            .set_data(path, data, version)
            .map(|_| ())
            .map_err(|e| client_error(path, e))
    }

    fn exists(&self, path: &str) -> ClientResult<bool> {
        self.zk
            .exists(path, false)
            .map(|stat| stat.is_some())
            .map_err(|e| client_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use std::io::{self, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    #[test]
    fn test_error_kinds_are_preserved() {
        assert_eq!(client_error("/a", ZkError::NoNode), ClientError::no_node("/a"));
        assert_eq!(
            client_error("/a", ZkError::NodeExists),
            ClientError::node_exists("/a")
        );
        assert_eq!(
            client_error("/a", ZkError::BadVersion),
            ClientError::bad_version("/a")
        );
        assert!(matches!(
            client_error("/a", ZkError::NoAuth),
            ClientError::Remote { ref path, .. } if path == "/a"
        ));
    }

    #[test]
    fn test_acl_conversion() {
        let acls = vec![
            Acl::open(),
            Acl::new(Perms::READ, Identity::new("digest", "user:hash")),
            Acl::new(
                Perms(Perms::WRITE.bits() | Perms::ADMIN.bits()),
                Identity::new("ip", "10.0.0.0/8"),
            ),
            Acl::new(Perms(0), Identity::new("sasl", "svc")),
        ];
        let zk_acls = to_zk_acls(&acls);
        assert!(PERMISSIONS.iter().all(|(_, zk)| zk_acls[0].perms.can(*zk)));
        assert!(zk_acls[2].perms.can(Permission::ADMIN));
        assert!(!zk_acls[2].perms.can(Permission::READ));
        assert!(!PERMISSIONS.iter().any(|(_, zk)| zk_acls[3].perms.can(*zk)));

        let converted: Vec<Acl> = zk_acls.into_iter().map(from_zk_acl).collect();
        assert_eq!(converted, acls);
        assert_eq!(converted[0].id, Identity::Anyone);
    }

    #[test]
    fn test_wait_connected_follows_session_states() {
        let (tx, rx) = mpsc::channel();
        tx.send(ZkState::Connecting).expect("send");
        tx.send(ZkState::Connected).expect("send");
        assert!(wait_connected(&rx, Duration::from_millis(100)).is_ok());

        let (tx, rx) = mpsc::channel();
        tx.send(ZkState::AuthFailed).expect("send");
        let err = wait_connected(&rx, Duration::from_millis(100)).expect_err("auth");
        assert!(err.to_string().contains("authentication"));

        let (_tx, rx) = mpsc::channel();
        let err = wait_connected(&rx, Duration::from_millis(10)).expect_err("timeout");
        assert!(err.to_string().contains("timed out"));
    }

    fn read_frame(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
        let mut len = [0u8; 4];
        stream.read_exact(&mut len)?;
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
        stream.read_exact(&mut body)?;
        Ok(body)
    }

    fn write_frame(stream: &mut TcpStream, body: &[u8]) -> io::Result<()> {
        let len = u32::try_from(body.len()).expect("frame length");
        stream.write_all(&len.to_be_bytes())?;
        stream.write_all(body)
    }

    /// Accepts the session handshake, then acknowledges every request
    fn serve_session(mut stream: TcpStream) -> io::Result<()> {
        let _ = read_frame(&mut stream)?;
        // Leave the client time to register its state listener.
        thread::sleep(Duration::from_millis(50));

        let mut reply = Vec::new();
        reply.extend_from_slice(&0i32.to_be_bytes()); // protocol version
        reply.extend_from_slice(&30_000i32.to_be_bytes()); // negotiated timeout
        reply.extend_from_slice(&1i64.to_be_bytes()); // session id
        reply.extend_from_slice(&16i32.to_be_bytes());
        reply.extend_from_slice(&[0u8; 16]); // password
        reply.push(0); // read-only
        write_frame(&mut stream, &reply)?;

        loop {
            let request = read_frame(&mut stream)?;
            let mut header = Vec::new();
            header.extend_from_slice(&request[..4]); // xid
            header.extend_from_slice(&0i64.to_be_bytes()); // zxid
            header.extend_from_slice(&0i32.to_be_bytes()); // error code
            write_frame(&mut stream, &header)?;
        }
    }

    fn local_server() -> io::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let _ = thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                let _ = serve_session(stream);
            }
        });
        Ok(addr.to_string())
    }

    #[test]
    fn test_connect_waits_for_the_session() -> anyhow::Result<()> {
        let addr = local_server()?;
        let cli = Cli::try_parse_from([
            "zksnap",
            "backup",
            "-z",
            addr.as_str(),
            "--connect-timeout",
            "5000",
        ])?;

        let client = ZkTreeClient::connect(cli.command.common())?;
        client.close();
        Ok(())
    }
}
