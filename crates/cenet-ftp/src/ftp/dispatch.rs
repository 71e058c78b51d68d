//! Per-verb command sequences.
//!
//! Every request gets its own session: connect, log in, CWD into the
//! target directory unless it is the root, run the verb, QUIT. Downloads
//! and uploads hand the session to their data stream, which sends QUIT
//! when it is closed.

use crate::ftp::connection::NetStream;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::path::{self, split_remote_path, RemoteTarget};
use crate::ftp::reply;
use crate::ftp::request::FtpWebRequest;
use crate::ftp::response::FtpWebResponse;
use crate::ftp::session::FtpSession;
use crate::ftp::stream::{FtpDataStream, FtpRequestStream, StreamDirection};
use crate::ftp::types::{FtpEndpoint, FtpMethod, FtpReply, FtpRequestOptions};
use tokio::io::AsyncWriteExt;
use url::Url;

pub(crate) async fn get_response(request: FtpWebRequest) -> FtpResult<FtpWebResponse> {
    log::debug!("{} {}", request.method(), request.uri());
    if request.method().is_upload() {
        let stream = open_upload(request).await?;
        return stream.finish().await;
    }
    let abort = request.abort_signal().clone();
    let result = abort
        .run(run(&request))
        .await
        .unwrap_or_else(|| Err(FtpError::canceled()));
    if let Err(e) = &result {
        log::debug!("{} {} failed: {}", request.method(), request.uri(), e);
    }
    result
}

pub(crate) async fn open_upload(request: FtpWebRequest) -> FtpResult<FtpRequestStream> {
    let abort = request.abort_signal().clone();
    abort
        .run(start_upload(&request))
        .await
        .unwrap_or_else(|| Err(FtpError::canceled()))
}

fn target_of(request: &FtpWebRequest) -> RemoteTarget {
    split_remote_path(
        &request.remote_path(),
        request.method().addressing(),
        request.options().path_kind,
    )
}

fn leaf_of<'a>(target: &'a RemoteTarget, method: &FtpMethod) -> FtpResult<&'a str> {
    target
        .leaf
        .as_deref()
        .ok_or_else(|| FtpError::invalid_config(format!("{} needs a file name in the URI", method)))
}

fn response_for(session: &FtpSession, uri: Url, reply: &FtpReply) -> FtpWebResponse {
    let mut response = FtpWebResponse::new(uri, reply);
    response.banner_message = Some(session.banner().text());
    response.welcome_message = session.welcome().map(FtpReply::text);
    response
}

async fn enter(session: &mut FtpSession, target: &RemoteTarget) -> FtpResult<()> {
    if !target.is_root() {
        session.cwd(&target.directory).await?;
    }
    Ok(())
}

async fn run(request: &FtpWebRequest) -> FtpResult<FtpWebResponse> {
    let endpoint = request.endpoint()?;
    let target = target_of(request);
    let mut session = FtpSession::open(&endpoint, request.options()).await?;

    if request.method().is_download() {
        return match open_download(&mut session, request, &target).await {
            Ok((mut response, reply, data)) => {
                let abort = request.abort_signal().clone();
                let mut stream = FtpDataStream::new(StreamDirection::Read, data, session, abort);
                if reply.is_completion() {
                    stream = stream.completed_early(reply);
                }
                response.stream = Some(stream);
                Ok(response)
            }
            Err(e) => {
                session.close().await;
                Err(e)
            }
        };
    }

    let result = run_command(&mut session, request, &target).await;
    session.close().await;
    let mut response = result?;
    response.exit_message = session.exit_reply().map(FtpReply::text);
    Ok(response)
}

/// Verbs answered entirely on the control channel.
async fn run_command(
    session: &mut FtpSession,
    request: &FtpWebRequest,
    target: &RemoteTarget,
) -> FtpResult<FtpWebResponse> {
    enter(session, target).await?;
    let method = request.method();
    let uri = request.uri().clone();

    let response = match method {
        FtpMethod::DeleteFile => {
            let reply = session
                .expect_positive(&format!("DELE {}", leaf_of(target, method)?))
                .await?;
            response_for(session, uri, &reply)
        }
        FtpMethod::MakeDirectory => {
            let reply = session
                .expect_positive(&format!("MKD {}", leaf_of(target, method)?))
                .await?;
            let mut response = response_for(session, uri, &reply);
            response.reported_path = reply::quoted_path_of(&reply.text());
            response
        }
        FtpMethod::RemoveDirectory => {
            let reply = session
                .expect_positive(&format!("RMD {}", leaf_of(target, method)?))
                .await?;
            response_for(session, uri, &reply)
        }
        FtpMethod::Rename => {
            let to = request
                .options()
                .rename_to
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| FtpError::invalid_config("Rename needs a target name"))?;
            session
                .expect_positive(&format!("RNFR {}", leaf_of(target, method)?))
                .await?;
            let reply = session.expect_positive(&format!("RNTO {}", to)).await?;
            response_for(session, uri, &reply)
        }
        FtpMethod::GetDateTimestamp => {
            let reply = session
                .expect_positive(&format!("MDTM {}", leaf_of(target, method)?))
                .await?;
            let mut response = response_for(session, uri, &reply);
            response.last_modified = reply::timestamp_of(reply.last_line());
            response
        }
        FtpMethod::GetFileSize => {
            let reply = session
                .expect_positive(&format!("SIZE {}", leaf_of(target, method)?))
                .await?;
            let mut response = response_for(session, uri, &reply);
            response.content_length = reply::size_of(reply.last_line());
            response
        }
        FtpMethod::PrintWorkingDirectory => {
            let reply = session.expect_positive("PWD").await?;
            let mut response = response_for(session, uri, &reply);
            response.reported_path = reply::quoted_path_of(&reply.text());
            response
        }
        FtpMethod::Raw(cmd) => {
            let reply = session.expect_positive(cmd).await?;
            response_for(session, uri, &reply)
        }
        FtpMethod::DownloadFile
        | FtpMethod::ListDirectory
        | FtpMethod::ListDirectoryDetails
        | FtpMethod::UploadFile
        | FtpMethod::AppendFile
        | FtpMethod::UploadFileWithUniqueName => {
            return Err(FtpError::unsupported(format!(
                "{} needs a data channel",
                method
            )))
        }
    };
    Ok(response)
}

/// RETR, NLST and LIST: returns the response, the verb's reply and the
/// open data socket.
async fn open_download(
    session: &mut FtpSession,
    request: &FtpWebRequest,
    target: &RemoteTarget,
) -> FtpResult<(FtpWebResponse, FtpReply, NetStream)> {
    enter(session, target).await?;
    let method = request.method();
    let cmd = match method {
        FtpMethod::DownloadFile => format!("RETR {}", leaf_of(target, method)?),
        FtpMethod::ListDirectory | FtpMethod::ListDirectoryDetails => match &target.leaf {
            Some(leaf) => format!("{} {}", method.verb(), leaf),
            None => method.verb().to_string(),
        },
        _ => return Err(FtpError::unsupported(format!("{} has no download stream", method))),
    };

    let offset = request.options().content_offset;
    if offset > 0 && *method == FtpMethod::DownloadFile {
        session.expect_positive(&format!("REST {}", offset)).await?;
    }

    let pending = session.prepare_data_channel().await?;
    let reply = session.expect_positive(&cmd).await?;
    let data = session.establish(pending).await?;

    let mut response = response_for(session, request.uri().clone(), &reply);
    if *method == FtpMethod::DownloadFile {
        response.content_length = reply::announced_length_of(&reply.text());
    }
    Ok((response, reply, data))
}

async fn start_upload(request: &FtpWebRequest) -> FtpResult<FtpRequestStream> {
    let endpoint = request.endpoint()?;
    let method = request.method();
    let target = target_of(request);

    let (leaf, uri) = if *method == FtpMethod::UploadFileWithUniqueName {
        let name = reserve_unique_name(&endpoint, request.options(), &target).await?;
        let mut uri = request.uri().clone();
        uri.set_path(&path::encode_path(&target.join(&name)));
        log::debug!("server assigned {}", uri);
        (name, uri)
    } else {
        (leaf_of(&target, method)?.to_string(), request.uri().clone())
    };
    let verb = match method {
        FtpMethod::AppendFile => "APPE",
        _ => "STOR",
    };

    let mut session = FtpSession::open(&endpoint, request.options()).await?;
    match begin_upload(&mut session, request, &target, &format!("{} {}", verb, leaf)).await {
        Ok((reply, data)) => {
            let response = response_for(&session, uri, &reply);
            let abort = request.abort_signal().clone();
            let mut stream = FtpDataStream::new(StreamDirection::Write, data, session, abort);
            if reply.is_completion() {
                stream = stream.completed_early(reply);
            }
            Ok(FtpRequestStream::new(stream, response))
        }
        Err(e) => {
            session.close().await;
            Err(e)
        }
    }
}

async fn begin_upload(
    session: &mut FtpSession,
    request: &FtpWebRequest,
    target: &RemoteTarget,
    cmd: &str,
) -> FtpResult<(FtpReply, NetStream)> {
    enter(session, target).await?;
    let offset = request.options().content_offset;
    if offset > 0 && *request.method() == FtpMethod::UploadFile {
        session.expect_positive(&format!("REST {}", offset)).await?;
    }
    let pending = session.prepare_data_channel().await?;
    let reply = session.expect_positive(cmd).await?;
    let data = session.establish(pending).await?;
    Ok((reply, data))
}

/// Ask the server for a unique name with an empty STOU on its own
/// session. The body then goes up under that name with STOR.
async fn reserve_unique_name(
    endpoint: &FtpEndpoint,
    options: &FtpRequestOptions,
    target: &RemoteTarget,
) -> FtpResult<String> {
    let mut session = FtpSession::open(endpoint, options).await?;
    let result = reserve_on(&mut session, target).await;
    session.close().await;
    result
}

async fn reserve_on(session: &mut FtpSession, target: &RemoteTarget) -> FtpResult<String> {
    enter(session, target).await?;
    let pending = session.prepare_data_channel().await?;
    let reply = session.expect_positive("STOU").await?;
    let mut name = reply::unique_filename_of(reply.last_line());

    if !reply.is_completion() {
        let mut data = session.establish(pending).await?;
        if let Err(e) = data.shutdown().await {
            log::debug!("[{}] closing STOU data channel: {}", session.id, e);
        }
        drop(data);
        let done = session.read_reply().await?;
        let done = session.check(done)?;
        if name.is_none() {
            name = reply::unique_filename_of(done.last_line());
        }
    }

    name.ok_or_else(|| {
        session.fail(FtpError::protocol_error(
            "Server did not report the unique file name",
        ))
    })
}
