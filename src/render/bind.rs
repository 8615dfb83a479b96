use serde::Deserialize;

use crate::dispatcher::{Command, ConfigForm};

/// What a bound control does when the operator activates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Refresh,
    Start,
    Stop,
    Buy,
    Sell,
    SaveConfig,
    ClearAlerts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Trading,
    Orders,
    Config,
    Alerts,
}

/// A control of the card markup and the action it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub id: &'static str,
    pub label: &'static str,
    pub action: ControlAction,
    pub section: Section,
}

impl Control {
    /// Host route the control submits to.
    pub fn route(&self) -> String {
        format!("/card/{}", self.id)
    }
}

/// Bind table. `refresh` comes first so that pressing Enter in a field submits nothing harmful.
pub const CONTROLS: [Control; 7] = [
    Control { id: "refresh", label: "Refresh", action: ControlAction::Refresh, section: Section::Trading },
    Control { id: "start", label: "Start", action: ControlAction::Start, section: Section::Trading },
    Control { id: "stop", label: "Stop", action: ControlAction::Stop, section: Section::Trading },
    Control { id: "buy", label: "Buy", action: ControlAction::Buy, section: Section::Orders },
    Control { id: "sell", label: "Sell", action: ControlAction::Sell, section: Section::Orders },
    Control { id: "savecfg", label: "Save config", action: ControlAction::SaveConfig, section: Section::Config },
    Control { id: "clear", label: "Clear alerts", action: ControlAction::ClearAlerts, section: Section::Alerts },
];

#[cfg(test)]
pub fn control(id: &str) -> Option<&'static Control> {
    CONTROLS.iter().find(|c| c.id == id)
}

pub fn controls_in(section: Section) -> Vec<&'static Control> {
    CONTROLS.iter().filter(|c| c.section == section).collect()
}

/// Every field of the card form as submitted. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CardForm {
    pub autotrade: Option<String>,
    pub pair: Option<String>,
    pub amount: Option<String>,
    pub min_profit: Option<String>,
    pub hysteresis: Option<String>,
    pub drawdown: Option<String>,
    pub min_trades: Option<String>,
    pub base_package: Option<String>,
    pub multiplier: Option<String>,
    pub lookback: Option<String>,
}

impl CardForm {
    /// An HTML checkbox submits its value only when checked.
    pub fn autotrade(&self) -> bool {
        matches!(self.autotrade.as_deref(), Some("true" | "on" | "1"))
    }

    pub fn config_form(&self) -> ConfigForm {
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        ConfigForm {
            min_profit: field(&self.min_profit),
            hysteresis: field(&self.hysteresis),
            drawdown: field(&self.drawdown),
            min_trades: field(&self.min_trades),
            base_package: field(&self.base_package),
            multiplier: field(&self.multiplier),
            lookback: field(&self.lookback),
        }
    }

    /// The command `action` issues with these field values. `Refresh` is not a command.
    pub fn command(&self, action: ControlAction) -> Option<Command> {
        let command = match action {
            ControlAction::Refresh => return None,
            ControlAction::Start => Command::Start {
                autotrade: self.autotrade(),
            },
            ControlAction::Stop => Command::Stop,
            ControlAction::Buy => Command::Buy {
                pair: self.pair.clone(),
                amount: self.amount.clone(),
            },
            ControlAction::Sell => Command::Sell {
                pair: self.pair.clone(),
                package_id: None,
            },
            ControlAction::SaveConfig => Command::SaveConfig(self.config_form()),
            ControlAction::ClearAlerts => Command::ClearAlerts,
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_ids_are_unique_and_routed() {
        let mut ids: Vec<&str> = CONTROLS.iter().map(|c| c.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), CONTROLS.len());
        assert_eq!(control("savecfg").unwrap().route(), "/card/savecfg");
        assert_eq!(control("clear").unwrap().action, ControlAction::ClearAlerts);
        assert!(control("pause").is_none());
        assert_eq!(CONTROLS[0].action, ControlAction::Refresh);
    }

    #[test]
    fn test_form_to_commands() {
        let form = CardForm {
            autotrade: Some("on".to_string()),
            pair: Some("ETHUSDC".to_string()),
            amount: Some("".to_string()),
            multiplier: Some("2.5".to_string()),
            ..CardForm::default()
        };

        assert_eq!(form.command(ControlAction::Refresh), None);
        assert_eq!(
            form.command(ControlAction::Start),
            Some(Command::Start { autotrade: true })
        );
        assert_eq!(
            form.command(ControlAction::Buy),
            Some(Command::Buy {
                pair: Some("ETHUSDC".to_string()),
                amount: Some("".to_string()),
            })
        );
        match form.command(ControlAction::SaveConfig) {
            Some(Command::SaveConfig(config)) => {
                assert_eq!(config.multiplier, "2.5");
                assert_eq!(config.min_profit, "");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unchecked_autotrade() {
        assert!(!CardForm::default().autotrade());
        assert_eq!(
            CardForm::default().command(ControlAction::Start),
            Some(Command::Start { autotrade: false })
        );
    }
}
