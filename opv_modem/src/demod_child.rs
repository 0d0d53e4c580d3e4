use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::debug;

use opv_phy::modem::{samples_to_bytes, IqSample};
use opv_phy::numerology::FRAME_BYTES;
use opv_phy::Frame;

/// decoded frames that may queue between the reader thread and the loop
const FRAME_QUEUE: usize = 64;
/// grace period for the child to exit after its stdin closes
const REAP_GRACE: Duration = Duration::from_millis(100);

/// A persistent demodulator subprocess.
///
/// The child runs `<demod> --stream --raw`: I/Q in on stdin, packed
/// 134-byte frames out on stdout.  A reader thread owns the child's
/// stdout and forwards whole frames over a bounded channel; channel
/// disconnection therefore means the child reached EOF or died.
/// Dropping the handle closes the child's stdin to signal EOF, waits a
/// short grace period, then terminates and reaps.
pub struct DemodChild {
  child: Child,
  stdin: Option<ChildStdin>,
  frames: Receiver<Frame>,
  reader: Option<JoinHandle<()>>,
}

impl DemodChild {
  /// Spawn the demodulator and start draining its stdout.
  /// `verbose` passes the child's stderr diagnostics through.
  pub fn spawn(demod_path: &Path, verbose: bool) -> io::Result<Self> {
    let mut child = Command::new(demod_path)
      .arg("--stream")
      .arg("--raw")
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(if verbose { Stdio::inherit() } else { Stdio::null() })
      .spawn()?;

    // both pipes exist by construction
    let stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();

    let (frame_tx, frame_rx) = bounded(FRAME_QUEUE);
    let reader = thread::spawn(move || Self::reader(stdout, frame_tx));

    debug!("demodulator started: {}", demod_path.display());
    Ok(Self {
      child,
      stdin: Some(stdin),
      frames: frame_rx,
      reader: Some(reader),
    })
  }

  /// Reader thread: regroup the child's stdout into whole frames until
  /// EOF or until the service side hangs up.
  fn reader(mut stdout: impl Read, frames: Sender<Frame>) {
    let mut frame = [0; FRAME_BYTES];
    loop {
      if stdout.read_exact(&mut frame).is_err() {
        // EOF or a broken pipe: the channel disconnect tells the service
        break;
      }
      if frames.send(frame).is_err() {
        break;
      }
    }
  }

  /// Feed one frame's worth of I/Q to the child in a single write.
  /// A short write or broken pipe surfaces as an error and the caller
  /// drops the frame.
  pub fn write_iq(&mut self, samples: &[IqSample]) -> io::Result<()> {
    self.write_bytes(&samples_to_bytes(samples))
  }

  /// Forward raw wire bytes (already interleaved 16-bit LE I/Q).
  pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
    match self.stdin.as_mut() {
      Some(stdin) => stdin.write_all(bytes),
      None => Err(io::ErrorKind::BrokenPipe.into()),
    }
  }

  /// Close the child's stdin, signalling EOF so it can drain and exit.
  pub fn close_stdin(&mut self) {
    self.stdin = None;
  }

  /// Decoded frames, in decode order.  Disconnection means the child
  /// has exited.
  pub fn frames(&self) -> &Receiver<Frame> {
    &self.frames
  }
}

impl Drop for DemodChild {
  fn drop(&mut self) {
    self.stdin = None;
    thread::sleep(REAP_GRACE);
    if !matches!(self.child.try_wait(), Ok(Some(_))) {
      let _ = self.child.kill();
      let _ = self.child.wait();
    }
    if let Some(reader) = self.reader.take() {
      let _ = reader.join();
    }
  }
}
