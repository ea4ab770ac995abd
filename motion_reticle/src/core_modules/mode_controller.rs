// THEORY:
// The `ModeController` turns the single key read at the end of every cycle into a
// change of operating mode. It is a flat state machine: four independent flags
// plus a run state that is `Running`, `Paused` or `Terminated`.
//
// The controller never touches windows, files or the console itself. It returns a
// `Transition` describing what just changed and the session loop acts on it
// (closing a window, restarting the recording sequence, printing the message).
// That keeps the whole mode logic testable from plain key codes.
//
// While paused, only the pause key is honoured; everything else, the terminate key
// included, is ignored until the loop resumes.

/// Key code delivered for the escape key.
pub const KEY_ESCAPE: i32 = 27;

/// Everything a key can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Terminate,
    ToggleTracking,
    ToggleThresholdView,
    ToggleDifferenceView,
    ToggleRecording,
    Pause,
    Menu,
}

/// Key code assigned to each command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    pub terminate: i32,
    pub toggle_tracking: i32,
    pub toggle_threshold_view: i32,
    pub toggle_difference_view: i32,
    pub toggle_recording: i32,
    pub pause: i32,
    pub menu: i32,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            terminate: KEY_ESCAPE,
            toggle_tracking: 'q' as i32,
            toggle_threshold_view: 't' as i32,
            toggle_difference_view: 'd' as i32,
            toggle_recording: 'r' as i32,
            pause: 'p' as i32,
            menu: 'm' as i32,
        }
    }
}

impl KeyBindings {
    pub fn command_for(&self, key: i32) -> Option<Command> {
        let table = [
            (self.terminate, Command::Terminate),
            (self.toggle_tracking, Command::ToggleTracking),
            (self.toggle_threshold_view, Command::ToggleThresholdView),
            (self.toggle_difference_view, Command::ToggleDifferenceView),
            (self.toggle_recording, Command::ToggleRecording),
            (self.pause, Command::Pause),
            (self.menu, Command::Menu),
        ];
        table
            .into_iter()
            .find(|(code, _)| *code == key)
            .map(|(_, command)| command)
    }

    /// The command legend printed at startup and on the menu key.
    pub fn legend(&self) -> String {
        let rows = [
            (self.toggle_tracking, "toggle tracking"),
            (self.toggle_difference_view, "toggle difference image"),
            (self.toggle_threshold_view, "toggle threshold image"),
            (self.toggle_recording, "toggle recording"),
            (self.pause, "pause / resume"),
            (self.menu, "show this menu"),
            (self.terminate, "quit"),
        ];
        let mut legend = String::from("Commands:\n");
        for (code, description) in rows {
            legend.push_str(&format!("  {:<5} {}\n", key_name(code), description));
        }
        legend
    }
}

fn key_name(code: i32) -> String {
    match code {
        KEY_ESCAPE => "ESC".to_string(),
        _ => u8::try_from(code)
            .ok()
            .filter(u8::is_ascii_graphic)
            .map(|byte| (byte as char).to_string())
            .unwrap_or_else(|| format!("#{code}")),
    }
}

/// The four independent display/processing toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    pub tracking_enabled: bool,
    pub show_difference: bool,
    pub show_threshold: bool,
    pub recording_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Terminated,
}

/// What a key press changed. Toggles carry the flag's new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ignored,
    Terminated,
    TrackingToggled(bool),
    ThresholdViewToggled(bool),
    DifferenceViewToggled(bool),
    RecordingToggled(bool),
    Paused,
    Resumed,
    MenuRequested,
}

impl Transition {
    /// Console message announcing the transition, if it has one.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Transition::TrackingToggled(true) => Some("Tracking enabled"),
            Transition::TrackingToggled(false) => Some("Tracking disabled"),
            Transition::ThresholdViewToggled(true) => Some("Threshold image display enabled"),
            Transition::ThresholdViewToggled(false) => Some("Threshold image display disabled"),
            Transition::DifferenceViewToggled(true) => Some("Difference image display enabled"),
            Transition::DifferenceViewToggled(false) => Some("Difference image display disabled"),
            Transition::RecordingToggled(true) => Some("Recording enabled"),
            Transition::RecordingToggled(false) => Some("Recording disabled"),
            Transition::Paused => Some("PAUSED  Press the pause key to resume"),
            Transition::Resumed => Some("RESUMED"),
            Transition::Ignored | Transition::Terminated | Transition::MenuRequested => None,
        }
    }
}

pub struct ModeController {
    flags: ModeFlags,
    state: RunState,
    bindings: KeyBindings,
}

impl ModeController {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            flags: ModeFlags::default(),
            state: RunState::Running,
            bindings,
        }
    }

    /// Consumes one polled key (or the lack of one) and applies it.
    pub fn handle_key(&mut self, key: Option<i32>) -> Transition {
        let command = key.and_then(|code| self.bindings.command_for(code));
        match (self.state, command) {
            (RunState::Terminated, _) | (_, None) => Transition::Ignored,
            (RunState::Paused, Some(Command::Pause)) => {
                self.state = RunState::Running;
                Transition::Resumed
            }
            (RunState::Paused, Some(_)) => Transition::Ignored,
            (RunState::Running, Some(command)) => self.apply(command),
        }
    }

    fn apply(&mut self, command: Command) -> Transition {
        let flags = &mut self.flags;
        match command {
            Command::Terminate => {
                self.state = RunState::Terminated;
                Transition::Terminated
            }
            Command::ToggleTracking => {
                flags.tracking_enabled = !flags.tracking_enabled;
                Transition::TrackingToggled(flags.tracking_enabled)
            }
            Command::ToggleThresholdView => {
                flags.show_threshold = !flags.show_threshold;
                Transition::ThresholdViewToggled(flags.show_threshold)
            }
            Command::ToggleDifferenceView => {
                flags.show_difference = !flags.show_difference;
                Transition::DifferenceViewToggled(flags.show_difference)
            }
            Command::ToggleRecording => {
                flags.recording_enabled = !flags.recording_enabled;
                Transition::RecordingToggled(flags.recording_enabled)
            }
            Command::Pause => {
                self.state = RunState::Paused;
                Transition::Paused
            }
            Command::Menu => Transition::MenuRequested,
        }
    }

    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: char) -> Option<i32> {
        Some(c as i32)
    }

    #[test]
    fn starts_running_with_everything_off() {
        let controller = ModeController::default();
        assert_eq!(controller.state(), RunState::Running);
        assert_eq!(controller.flags(), ModeFlags::default());
    }

    #[test]
    fn each_toggle_flips_only_its_flag() {
        let mut controller = ModeController::default();

        assert_eq!(controller.handle_key(key('q')), Transition::TrackingToggled(true));
        assert_eq!(controller.handle_key(key('d')), Transition::DifferenceViewToggled(true));
        assert_eq!(controller.handle_key(key('t')), Transition::ThresholdViewToggled(true));
        assert_eq!(controller.handle_key(key('r')), Transition::RecordingToggled(true));
        assert_eq!(
            controller.flags(),
            ModeFlags {
                tracking_enabled: true,
                show_difference: true,
                show_threshold: true,
                recording_enabled: true,
            }
        );

        assert_eq!(controller.handle_key(key('d')), Transition::DifferenceViewToggled(false));
        assert_eq!(
            controller.flags(),
            ModeFlags {
                tracking_enabled: true,
                show_difference: false,
                show_threshold: true,
                recording_enabled: true,
            }
        );
    }

    #[test]
    fn double_toggle_restores_the_flag() {
        let mut controller = ModeController::default();
        controller.handle_key(key('r'));
        assert_eq!(controller.handle_key(key('r')), Transition::RecordingToggled(false));
        assert!(!controller.flags().recording_enabled);
    }

    #[test]
    fn unknown_keys_and_silence_are_ignored() {
        let mut controller = ModeController::default();
        assert_eq!(controller.handle_key(None), Transition::Ignored);
        assert_eq!(controller.handle_key(key('z')), Transition::Ignored);
        assert_eq!(controller.handle_key(Some(-1)), Transition::Ignored);
        assert_eq!(controller.flags(), ModeFlags::default());
    }

    #[test]
    fn menu_changes_nothing() {
        let mut controller = ModeController::default();
        assert_eq!(controller.handle_key(key('m')), Transition::MenuRequested);
        assert_eq!(controller.flags(), ModeFlags::default());
        assert_eq!(controller.state(), RunState::Running);
    }

    #[test]
    fn pause_only_yields_to_the_pause_key() {
        let mut controller = ModeController::default();
        controller.handle_key(key('q'));

        assert_eq!(controller.handle_key(key('p')), Transition::Paused);
        assert_eq!(controller.state(), RunState::Paused);

        for ignored in [key('q'), key('r'), Some(KEY_ESCAPE), None] {
            assert_eq!(controller.handle_key(ignored), Transition::Ignored);
        }
        assert_eq!(controller.state(), RunState::Paused);
        assert!(controller.flags().tracking_enabled);
        assert!(!controller.flags().recording_enabled);

        assert_eq!(controller.handle_key(key('p')), Transition::Resumed);
        assert_eq!(controller.state(), RunState::Running);
    }

    #[test]
    fn escape_terminates_for_good() {
        let mut controller = ModeController::default();
        assert_eq!(controller.handle_key(Some(KEY_ESCAPE)), Transition::Terminated);
        assert_eq!(controller.handle_key(key('q')), Transition::Ignored);
        assert_eq!(controller.state(), RunState::Terminated);
        assert!(!controller.flags().tracking_enabled);
    }

    #[test]
    fn custom_bindings_are_honoured() {
        let bindings = KeyBindings {
            toggle_tracking: 'x' as i32,
            ..KeyBindings::default()
        };
        let mut controller = ModeController::new(bindings);
        assert_eq!(controller.handle_key(key('q')), Transition::Ignored);
        assert_eq!(controller.handle_key(key('x')), Transition::TrackingToggled(true));
    }

    #[test]
    fn legend_lists_every_key() {
        let legend = KeyBindings::default().legend();
        for needle in ["ESC", " q ", " d ", " t ", " r ", " p ", " m "] {
            assert!(legend.contains(needle), "legend missing {needle:?}:\n{legend}");
        }
    }

    #[test]
    fn toggles_announce_themselves() {
        assert_eq!(Transition::TrackingToggled(true).message(), Some("Tracking enabled"));
        assert_eq!(
            Transition::ThresholdViewToggled(false).message(),
            Some("Threshold image display disabled")
        );
        assert_eq!(Transition::Ignored.message(), None);
    }
}
