//! Loopback FTP server for integration tests.
//!
//! Login, TYPE, CWD, PASV, EPSV, PORT, EPRT and QUIT are answered by the server
//! itself.
//! Every other verb is looked up in the script by its verb word; verbs
//! missing from the script get `502`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone)]
pub enum Reply {
    /// Answer on the control channel only.
    Line(&'static str),
    /// Open the data channel, send `body`, then send `completion`.
    Send {
        preliminary: &'static str,
        body: Vec<u8>,
        completion: &'static str,
    },
    /// Open the data channel, read it to EOF, then send `completion`.
    Receive {
        preliminary: &'static str,
        completion: &'static str,
    },
    /// Hold the reply back for the given time, then answer like `Line`.
    Slow(Duration, &'static str),
}

#[derive(Default)]
struct Log {
    commands: Vec<String>,
    uploads: Vec<(String, Vec<u8>)>,
    sessions: usize,
}

#[derive(Clone)]
pub struct FakeServer {
    pub port: u16,
    log: Arc<Mutex<Log>>,
}

impl FakeServer {
    pub async fn start(script: Vec<(&'static str, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let log = Arc::new(Mutex::new(Log::default()));
        let script: Arc<HashMap<&'static str, Reply>> = Arc::new(script.into_iter().collect());

        let accept_log = Arc::clone(&log);
        tokio::spawn(async move {
            while let Ok((sock, _)) = listener.accept().await {
                accept_log.lock().unwrap().sessions += 1;
                let log = Arc::clone(&accept_log);
                let script = Arc::clone(&script);
                tokio::spawn(async move {
                    let _ = serve(sock, script, log).await;
                });
            }
        });
        Self { port, log }
    }

    pub fn uri(&self, path: &str) -> String {
        format!("ftp://127.0.0.1:{}{}", self.port, path)
    }

    /// Every command received across all sessions, PASS arguments included.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().commands.clone()
    }

    /// `(command, body)` for each upload received.
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.log.lock().unwrap().uploads.clone()
    }

    pub fn sessions(&self) -> usize {
        self.log.lock().unwrap().sessions
    }
}

enum DataPlan {
    Passive(TcpListener),
    Active(SocketAddr),
}

async fn open_data(plan: Option<DataPlan>) -> std::io::Result<Option<TcpStream>> {
    match plan {
        Some(DataPlan::Passive(listener)) => Ok(Some(listener.accept().await?.0)),
        Some(DataPlan::Active(addr)) => Ok(Some(TcpStream::connect(addr).await?)),
        None => Ok(None),
    }
}

/// `PORT h1,h2,h3,h4,p1,p2`
fn parse_port_argument(line: &str) -> Option<SocketAddr> {
    let nums: Vec<u8> = line
        .split_whitespace()
        .nth(1)?
        .split(',')
        .map(|n| n.parse().ok())
        .collect::<Option<_>>()?;
    if nums.len() != 6 {
        return None;
    }
    let port = u16::from(nums[4]) << 8 | u16::from(nums[5]);
    Some(SocketAddr::from(([nums[0], nums[1], nums[2], nums[3]], port)))
}

/// `EPRT |af|ip|port|`
fn parse_eprt_argument(line: &str) -> Option<SocketAddr> {
    let arg = line.split_whitespace().nth(1)?;
    let delim = arg.chars().next()?;
    let fields: Vec<&str> = arg.split(delim).collect();
    if fields.len() != 5 {
        return None;
    }
    let ip: std::net::IpAddr = fields[2].parse().ok()?;
    let port: u16 = fields[3].parse().ok()?;
    Some(SocketAddr::new(ip, port))
}

async fn serve(
    sock: TcpStream,
    script: Arc<HashMap<&'static str, Reply>>,
    log: Arc<Mutex<Log>>,
) -> std::io::Result<()> {
    let (rd, mut wr) = sock.into_split();
    let mut rd = BufReader::new(rd);
    let mut data_plan: Option<DataPlan> = None;
    wr.write_all(b"220 fake server ready\r\n").await?;

    loop {
        let mut line = String::new();
        if rd.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let line = line.trim_end().to_string();
        log.lock().unwrap().commands.push(line.clone());
        let verb = line
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();

        let answer: String = match verb.as_str() {
            "USER" if line.ends_with("anonymous") => "230 anonymous ok\r\n".into(),
            "USER" => "331 password please\r\n".into(),
            "PASS" => "230 logged in\r\n".into(),
            "TYPE" => "200 type set\r\n".into(),
            "CWD" if !script.contains_key("CWD") => "250 directory changed\r\n".into(),
            "QUIT" => {
                wr.write_all(b"221 goodbye\r\n").await?;
                return Ok(());
            }
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let p = listener.local_addr()?.port();
                data_plan = Some(DataPlan::Passive(listener));
                format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{})\r\n",
                    p >> 8,
                    p & 0xff
                )
            }
            "EPSV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let p = listener.local_addr()?.port();
                data_plan = Some(DataPlan::Passive(listener));
                format!("229 Entering Extended Passive Mode (|||{}|)\r\n", p)
            }
            "PORT" => match parse_port_argument(&line) {
                Some(addr) => {
                    data_plan = Some(DataPlan::Active(addr));
                    "200 PORT command successful\r\n".into()
                }
                None => "501 bad PORT argument\r\n".into(),
            },
            "EPRT" => match parse_eprt_argument(&line) {
                Some(addr) => {
                    data_plan = Some(DataPlan::Active(addr));
                    "200 EPRT command successful\r\n".into()
                }
                None => "501 bad EPRT argument\r\n".into(),
            },
            _ => match script.get(verb.as_str()).cloned() {
                None => "502 not implemented\r\n".into(),
                Some(Reply::Line(text)) => format!("{}\r\n", text),
                Some(Reply::Slow(delay, text)) => {
                    tokio::time::sleep(delay).await;
                    format!("{}\r\n", text)
                }
                Some(Reply::Send {
                    preliminary,
                    body,
                    completion,
                }) => {
                    wr.write_all(format!("{}\r\n", preliminary).as_bytes()).await?;
                    if let Some(mut data) = open_data(data_plan.take()).await? {
                        data.write_all(&body).await?;
                        data.shutdown().await?;
                    }
                    format!("{}\r\n", completion)
                }
                Some(Reply::Receive {
                    preliminary,
                    completion,
                }) => {
                    wr.write_all(format!("{}\r\n", preliminary).as_bytes()).await?;
                    let mut body = Vec::new();
                    if let Some(mut data) = open_data(data_plan.take()).await? {
                        data.read_to_end(&mut body).await?;
                    }
                    log.lock().unwrap().uploads.push((line.clone(), body));
                    format!("{}\r\n", completion)
                }
            },
        };
        wr.write_all(answer.as_bytes()).await?;
    }
}
