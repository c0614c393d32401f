use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_foundation::{NSMutableDictionary, NSNumber, NSString};
use objc2_media_player::{
    MPMediaItemPropertyArtist, MPMediaItemPropertyPlaybackDuration, MPMediaItemPropertyTitle,
    MPNowPlayingInfoCenter, MPNowPlayingInfoPropertyElapsedPlaybackTime,
    MPNowPlayingInfoPropertyPlaybackRate, MPNowPlayingPlaybackState,
};

use crate::remote::{MediaControls, NowPlayingInfo};

/// Lock-screen / control-center metadata sink backed by
/// `MPNowPlayingInfoCenter`.
///
/// All writes hop to the main dispatch queue; macOS only registers the
/// process as the now-playing source when the info center is touched
/// from the main thread.
pub struct MpNowPlaying;

impl MediaControls for MpNowPlaying {
    fn update(&self, info: &NowPlayingInfo) {
        let info = info.clone();
        dispatch::Queue::main().exec_async(move || {
            set_now_playing_info(&info);
        });
    }

    fn clear(&self) {
        dispatch::Queue::main().exec_async(|| {
            clear_now_playing_sync();
        });
    }
}

/// Must be called on the main thread.
fn set_now_playing_info(info: &NowPlayingInfo) {
    unsafe {
        let center = MPNowPlayingInfoCenter::defaultCenter();
        let dict: Retained<NSMutableDictionary<NSString, AnyObject>> = NSMutableDictionary::new();

        let title_val = NSString::from_str(&info.title);
        let artist_val = NSString::from_str(&info.artist);
        let duration_val = NSNumber::new_f64(info.duration);
        let elapsed_val = NSNumber::new_f64(info.position);
        let rate_val = NSNumber::new_f64(if info.playing { 1.0 } else { 0.0 });

        dict.insert(MPMediaItemPropertyTitle, &*title_val);
        dict.insert(MPMediaItemPropertyArtist, &*artist_val);
        dict.insert(MPMediaItemPropertyPlaybackDuration, &*duration_val);
        dict.insert(MPNowPlayingInfoPropertyElapsedPlaybackTime, &*elapsed_val);
        dict.insert(MPNowPlayingInfoPropertyPlaybackRate, &*rate_val);

        center.setNowPlayingInfo(Some(&dict));
        center.setPlaybackState(if info.playing {
            MPNowPlayingPlaybackState::Playing
        } else {
            MPNowPlayingPlaybackState::Paused
        });
    }
}

/// Must be called on the main thread.
fn clear_now_playing_sync() {
    unsafe {
        let center = MPNowPlayingInfoCenter::defaultCenter();
        center.setNowPlayingInfo(None);
        center.setPlaybackState(MPNowPlayingPlaybackState::Stopped);
    }
}
