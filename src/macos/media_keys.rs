use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_media_player::{
    MPChangePlaybackPositionCommandEvent, MPRemoteCommandCenter, MPRemoteCommandEvent,
    MPRemoteCommandHandlerStatus,
};
use std::ptr::NonNull;
use tokio::sync::mpsc;

use crate::remote::RemoteCommand;

/// Registers handlers on `MPRemoteCommandCenter` that forward media-key
/// and lock-screen commands into `sender`. Drain the receiving side with
/// [`crate::audio::run_remote`].
///
/// Must be called on the main thread after the app has finished
/// launching. Returns tokens that MUST be kept alive for the handlers to
/// remain active.
pub fn register_remote_handlers(
    sender: mpsc::Sender<RemoteCommand>,
) -> Vec<Retained<AnyObject>> {
    let mut tokens = Vec::new();

    unsafe {
        let command_center = MPRemoteCommandCenter::sharedCommandCenter();

        let play_cmd = command_center.playCommand();
        play_cmd.setEnabled(true);
        let tx = sender.clone();
        let play_block = RcBlock::new(
            move |_event: NonNull<MPRemoteCommandEvent>| -> MPRemoteCommandHandlerStatus {
                forward(&tx, RemoteCommand::Play)
            },
        );
        tokens.push(play_cmd.addTargetWithHandler(&play_block));

        let pause_cmd = command_center.pauseCommand();
        pause_cmd.setEnabled(true);
        let tx = sender.clone();
        let pause_block = RcBlock::new(
            move |_event: NonNull<MPRemoteCommandEvent>| -> MPRemoteCommandHandlerStatus {
                forward(&tx, RemoteCommand::Pause)
            },
        );
        tokens.push(pause_cmd.addTargetWithHandler(&pause_block));

        let toggle_cmd = command_center.togglePlayPauseCommand();
        toggle_cmd.setEnabled(true);
        let tx = sender.clone();
        let toggle_block = RcBlock::new(
            move |_event: NonNull<MPRemoteCommandEvent>| -> MPRemoteCommandHandlerStatus {
                forward(&tx, RemoteCommand::TogglePlayPause)
            },
        );
        tokens.push(toggle_cmd.addTargetWithHandler(&toggle_block));

        let next_cmd = command_center.nextTrackCommand();
        next_cmd.setEnabled(true);
        let tx = sender.clone();
        let next_block = RcBlock::new(
            move |_event: NonNull<MPRemoteCommandEvent>| -> MPRemoteCommandHandlerStatus {
                forward(&tx, RemoteCommand::NextTrack)
            },
        );
        tokens.push(next_cmd.addTargetWithHandler(&next_block));

        let prev_cmd = command_center.previousTrackCommand();
        prev_cmd.setEnabled(true);
        let tx = sender.clone();
        let prev_block = RcBlock::new(
            move |_event: NonNull<MPRemoteCommandEvent>| -> MPRemoteCommandHandlerStatus {
                forward(&tx, RemoteCommand::PreviousTrack)
            },
        );
        tokens.push(prev_cmd.addTargetWithHandler(&prev_block));

        let position_cmd = command_center.changePlaybackPositionCommand();
        position_cmd.setEnabled(true);
        let tx = sender.clone();
        let position_block = RcBlock::new(
            move |event: NonNull<MPRemoteCommandEvent>| -> MPRemoteCommandHandlerStatus {
                let event = event.cast::<MPChangePlaybackPositionCommandEvent>();
                let position = event.as_ref().positionTime();
                forward(&tx, RemoteCommand::Seek(position))
            },
        );
        tokens.push(position_cmd.addTargetWithHandler(&position_block));
    }

    log::info!("Remote command handlers registered ({} tokens)", tokens.len());
    tokens
}

/// ObjC callbacks run outside the runtime, so this never blocks. A full
/// channel drops the command.
fn forward(
    sender: &mpsc::Sender<RemoteCommand>,
    command: RemoteCommand,
) -> MPRemoteCommandHandlerStatus {
    match sender.try_send(command) {
        Ok(()) => MPRemoteCommandHandlerStatus::Success,
        Err(e) => {
            log::warn!("Remote command dropped: {}", e);
            MPRemoteCommandHandlerStatus::CommandFailed
        }
    }
}
