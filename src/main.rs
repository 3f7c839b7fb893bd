//! Voidrunners headless driver
//!
//! Plays a full session (assembly, then a death battle) with auto-piloted
//! players against null collaborators. Useful for soak-testing tuning files.
//!
//! Usage: `voidrunners [PLAYERS] [TUNING.json]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::Vec2;

    use voidrunners::audio::NullAudio;
    use voidrunners::consts::{MAX_SUBSTEPS, REFERENCE_FPS, SIM_DT};
    use voidrunners::direction_from_angle;
    use voidrunners::input::{InputSource, PilotIntent, PlayerSlot};
    use voidrunners::render::NullRenderer;
    use voidrunners::sim::{Collaborators, ModeRules, Session, SessionState};
    use voidrunners::ui::NullHud;
    use voidrunners::{MatchTuning, SimResult};

    /// Give up if a session somehow never finishes (simulated seconds)
    const MAX_SESSION_SECONDS: f32 = 60.0 * 30.0;

    /// Circles, shoots constantly, and mashes accept on results screens
    #[derive(Debug, Default)]
    struct AutoPilot {
        time: f32,
    }

    impl InputSource for AutoPilot {
        fn intent(&mut self, slot: PlayerSlot) -> PilotIntent {
            let phase = self.time * 0.7 + f32::from(slot.0) * 1.7;
            PilotIntent {
                movement: direction_from_angle(phase),
                aim: direction_from_angle(phase * 1.3),
                fire: true,
                respawn: true,
                accept: true,
                ..Default::default()
            }
        }

        fn rumble(&mut self, _slot: PlayerSlot, _strength: f32, _seconds: f32) {}
        fn recoil(&mut self, _slot: PlayerSlot, _offset: Vec2) {}
    }

    pub fn run(player_count: u8, tuning_path: Option<String>) -> SimResult<()> {
        let assembly = match tuning_path {
            Some(path) => MatchTuning::load(path)?,
            None => MatchTuning::assembly(),
        };
        let minigames = [(ModeRules::DeathBattle, ModeRules::DeathBattle.default_tuning())];
        let mut session = Session::new(player_count, assembly, minigames)?;

        let mut renderer = NullRenderer;
        let mut audio = NullAudio;
        let mut hud = NullHud;
        let mut pilot = AutoPilot::default();

        session.start(&mut Collaborators {
            renderer: &mut renderer,
            audio: &mut audio,
            input: &mut pilot,
            hud: &mut hud,
        })?;

        let frame_dt = 1.0 / REFERENCE_FPS;
        let mut accumulator = 0.0;
        let mut last_state = session.state();
        while session.state() != SessionState::GameOver {
            if pilot.time > MAX_SESSION_SECONDS {
                log::warn!("Session still in {:?} after {MAX_SESSION_SECONDS}s; giving up", session.state());
                break;
            }
            pilot.time += frame_dt;
            accumulator += frame_dt;

            let mut collab = Collaborators {
                renderer: &mut renderer,
                audio: &mut audio,
                input: &mut pilot,
                hud: &mut hud,
            };
            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                session.update(SIM_DT, &mut collab)?;
                accumulator -= SIM_DT;
                substeps += 1;
            }

            if session.state() != last_state {
                last_state = session.state();
                if let Some(mode) = session.mode() {
                    log::info!("{}: {}", mode.rules().name(), mode.rules().description());
                }
            }
        }

        for (slot, rank) in session.final_ranks() {
            println!("Player {}: #{rank}", slot.0 + 1);
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    env_logger::init();
    log::info!("Voidrunners (headless) starting...");

    let mut args = std::env::args().skip(1);
    let player_count = args.next().and_then(|a| a.parse::<u8>().ok()).unwrap_or(2).clamp(1, 4);
    let tuning_path = args.next();

    match headless::run(player_count, tuning_path) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            log::error!("Session aborted: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The core is driven by the host game on wasm; nothing to run here
}
