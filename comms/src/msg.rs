use std::{borrow::Cow, io};

use crate::{
    Deserialize, Serialize,
    specs::{image::Dimensions, stats::StageStats},
};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR_KIND: Header = 0;
const CONTROL_KIND: Header = 1;
const SOURCE_KIND: Header = 2;
const OUTPUT_KIND: Header = 3;

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug)]
pub enum Payload<'a> {
    /// Rows scattered from the coordinator to a participant.
    Source(&'a [u8]),
    /// Rows gathered from a participant back into the coordinator.
    Output(&'a [u8]),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Join { rank: usize },
    Dimensions(Dimensions),
    Barrier,
    Release,
    ReportStats(StageStats),
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// A short label of the message variant, meant for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(Command::Join { .. }) => "control/join",
            Msg::Control(Command::Dimensions(_)) => "control/dimensions",
            Msg::Control(Command::Barrier) => "control/barrier",
            Msg::Control(Command::Release) => "control/release",
            Msg::Control(Command::ReportStats(_)) => "control/report_stats",
            Msg::Control(Command::Disconnect) => "control/disconnect",
            Msg::Data(Payload::Source(_)) => "data/source",
            Msg::Data(Payload::Output(_)) => "data/output",
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR_KIND.to_be_bytes());
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL_KIND.to_be_bytes());

                // SAFETY: Serialize impl for `Command` is derived and not implemented
                //         by hand. Nor has a non string-key map inside.
                serde_json::to_writer(buf, &cmd).unwrap();
                None
            }
            Msg::Data(payload) => {
                let (kind, rows) = match payload {
                    Payload::Source(rows) => (SOURCE_KIND, *rows),
                    Payload::Output(rows) => (OUTPUT_KIND, *rows),
                };

                buf.extend_from_slice(&kind.to_be_bytes());
                Some(rows)
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len());
        }

        let (kind_buf, rest) = buf.split_at(HEADER_SIZE);
        let mut kind = [0; HEADER_SIZE];
        kind.copy_from_slice(kind_buf);

        match Header::from_be_bytes(kind) {
            ERR_KIND => {
                let string = std::str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            CONTROL_KIND => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            SOURCE_KIND => Ok(Self::Data(Payload::Source(rest))),
            OUTPUT_KIND => Ok(Self::Data(Payload::Output(rest))),
            kind => Self::invalid_kind(kind),
        }
    }
}
