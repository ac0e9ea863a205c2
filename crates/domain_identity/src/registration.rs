//! Registration parsing
//!
//! `registerUser` receives positional string fields. Farmers send fifteen:
//!
//! ```text
//! userId, userType, fullName, farmId, address, coordinates, cropName,
//! cropType, season, cropState, accountNumber, bankName, homeAddress,
//! phone, email
//! ```
//!
//! Insurers send eight:
//!
//! ```text
//! userId, userType, fullName, accountNumber, bankName, homeAddress,
//! phone, email
//! ```
//!
//! The type and the arity are checked first. After that every field is
//! checked and all problems are reported together.

use std::str::FromStr;
use validator::{Validate, ValidationErrors};

use core_kernel::{FarmId, GeoCoordinates, UserId};

use crate::error::IdentityError;
use crate::user::{Account, Crop, Farm, User, UserType};

/// Number of fields in a farmer registration
pub const FARMER_FIELDS: usize = 15;

/// Number of fields in an insurer registration
pub const INSURER_FIELDS: usize = 8;

/// Registration fields before type conversion
///
/// Text fields are trimmed on the way in. Farm and crop fields are `None`
/// for insurers and skipped by validation.
#[derive(Debug, Clone, Default, Validate)]
pub struct RegistrationForm {
    #[validate(length(min = 1, message = "userId must not be empty"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "fullName must not be empty"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "farmId must not be empty"))]
    pub farm_id: Option<String>,
    #[validate(length(min = 1, message = "address must not be empty"))]
    pub address: Option<String>,
    #[validate(length(min = 1, message = "coordinates must not be empty"))]
    pub coordinates: Option<String>,
    #[validate(length(min = 1, message = "cropName must not be empty"))]
    pub crop_name: Option<String>,
    #[validate(length(min = 1, message = "cropType must not be empty"))]
    pub crop_type: Option<String>,
    #[validate(length(min = 1, message = "season must not be empty"))]
    pub season: Option<String>,
    #[validate(length(min = 1, message = "cropState must not be empty"))]
    pub crop_state: Option<String>,
    #[validate(length(min = 1, message = "accountNumber must not be empty"))]
    pub account_number: String,
    #[validate(length(min = 1, message = "bankName must not be empty"))]
    pub bank_name: String,
    #[validate(length(min = 1, message = "homeAddress must not be empty"))]
    pub home_address: String,
    #[validate(length(min = 1, message = "phone must not be empty"))]
    pub phone: String,
    #[validate(length(min = 1, message = "email must not be empty"))]
    pub email: String,
}

impl RegistrationForm {
    /// Splits positional arguments into a form, checking type and arity
    pub fn from_args(args: &[String]) -> Result<(UserType, Self), IdentityError> {
        let raw_type = args.get(1).ok_or_else(|| {
            IdentityError::InvalidArgument(format!(
                "registerUser expects at least userId and userType, got {} argument(s)",
                args.len()
            ))
        })?;
        let user_type = UserType::from_str(raw_type)?;

        let expected = match user_type {
            UserType::Farmer => FARMER_FIELDS,
            UserType::Insurer => INSURER_FIELDS,
        };
        if args.len() != expected {
            return Err(IdentityError::Arity {
                user_type: user_type.to_string(),
                expected,
                actual: args.len(),
            });
        }

        let field = |i: usize| args[i].trim().to_string();
        let form = match user_type {
            UserType::Farmer => Self {
                user_id: field(0),
                full_name: field(2),
                farm_id: Some(field(3)),
                address: Some(field(4)),
                coordinates: Some(field(5)),
                crop_name: Some(field(6)),
                crop_type: Some(field(7)),
                season: Some(field(8)),
                crop_state: Some(field(9)),
                account_number: field(10),
                bank_name: field(11),
                home_address: field(12),
                phone: field(13),
                email: field(14),
            },
            UserType::Insurer => Self {
                user_id: field(0),
                full_name: field(2),
                account_number: field(3),
                bank_name: field(4),
                home_address: field(5),
                phone: field(6),
                email: field(7),
                ..Default::default()
            },
        };
        Ok((user_type, form))
    }

    /// Converts the form into a user with a zero-balance account
    ///
    /// Collects every problem before failing.
    pub fn into_user(self, user_type: UserType) -> Result<User, IdentityError> {
        let mut problems = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => messages(&errors),
        };

        let user_id = check(&mut problems, non_empty(&self.user_id).map(UserId::new));
        let account_number = check(&mut problems, parse_integer("accountNumber", &self.account_number));
        let phone = check(&mut problems, parse_integer("phone", &self.phone));

        let farm = match user_type {
            UserType::Farmer => {
                let farm_id = check(
                    &mut problems,
                    self.farm_id.as_deref().and_then(non_empty).map(FarmId::new),
                );
                let coordinates = check(
                    &mut problems,
                    self.coordinates
                        .as_deref()
                        .and_then(non_empty)
                        .map(GeoCoordinates::from_str),
                );
                farm_id.zip(coordinates).map(|(farm_id, coordinates)| Farm {
                    farm_id,
                    address: self.address.clone().unwrap_or_default(),
                    coordinates,
                    crops: vec![Crop {
                        name: self.crop_name.clone().unwrap_or_default(),
                        crop_type: self.crop_type.clone().unwrap_or_default(),
                        season: self.season.clone().unwrap_or_default(),
                        state: self.crop_state.clone().unwrap_or_default(),
                    }],
                })
            }
            UserType::Insurer => None,
        };

        if !problems.is_empty() {
            return Err(IdentityError::InvalidRegistration(problems));
        }
        match (user_id, account_number, phone) {
            (Some(user_id), Some(account_number), Some(phone)) => Ok(User {
                user_id,
                user_type,
                full_name: self.full_name,
                home_address: self.home_address,
                phone,
                email: self.email,
                farms: farm.into_iter().collect(),
                accounts: vec![Account::open(account_number, self.bank_name)],
            }),
            _ => Err(IdentityError::InvalidRegistration(vec![
                "registration is incomplete".to_string(),
            ])),
        }
    }
}

/// Parses a full registration request
pub fn parse_registration(args: &[String]) -> Result<User, IdentityError> {
    let (user_type, form) = RegistrationForm::from_args(args)?;
    form.into_user(user_type)
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn parse_integer(field: &str, value: &str) -> Option<Result<i64, String>> {
    non_empty(value).map(|v| {
        v.parse::<i64>()
            .map_err(|_| format!("{} must be an integer, got '{}'", field, v))
    })
}

/// Records the error of a parsed field, skipping fields already reported
/// as empty by validation
fn check<T, E: ToString>(problems: &mut Vec<String>, parsed: Option<Result<T, E>>) -> Option<T> {
    match parsed? {
        Ok(value) => Some(value),
        Err(e) => {
            problems.push(e.to_string());
            None
        }
    }
}

fn messages(errors: &ValidationErrors) -> Vec<String> {
    let mut found: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, list)| {
            list.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn farmer_args() -> Vec<String> {
        args(&[
            "F1", "Farmer", "Asha Rao", "FARM1", "Plot 7, Hosur", "12.7409,77.8253", "Ragi",
            "Millet", "Kharif", "Sown", "100200300", "Canara Bank", "Hosur Village", "9876543210",
            "asha@example.com",
        ])
    }

    #[test]
    fn test_farmer_registration() {
        let user = parse_registration(&farmer_args()).unwrap();
        assert_eq!(user.user_type, UserType::Farmer);
        assert_eq!(user.phone, 9_876_543_210);
        assert_eq!(user.accounts.len(), 1);
        assert_eq!(user.accounts[0].balance, Decimal::ZERO);
        assert_eq!(user.accounts[0].account_number, 100_200_300);
        assert_eq!(user.farms.len(), 1);
        assert_eq!(user.farms[0].crops.len(), 1);
        assert_eq!(user.farms[0].crops[0].name, "Ragi");
        assert_eq!(user.farms[0].crops[0].state, "Sown");
    }

    #[test]
    fn test_phone_is_numeric() {
        let mut fields = farmer_args();
        fields[13] = "0987654321".to_string();
        assert_eq!(parse_registration(&fields).unwrap().phone, 987_654_321);
    }

    #[test]
    fn test_insurer_registration_has_no_farms() {
        let user = parse_registration(&args(&[
            "I1", "INSURER", "Monsoon Mutual", "4001", "State Bank", "12 MG Road", "8012345678",
            "claims@monsoon.example",
        ]))
        .unwrap();
        assert_eq!(user.user_type, UserType::Insurer);
        assert!(user.farms.is_empty());
    }

    #[test]
    fn test_arity_is_strict() {
        let mut long = farmer_args();
        long.push("extra".into());
        assert!(matches!(
            parse_registration(&long),
            Err(IdentityError::Arity { expected: 15, actual: 16, .. })
        ));

        let insurer_with_farmer_arity = {
            let mut a = farmer_args();
            a[1] = "insurer".into();
            a
        };
        assert!(matches!(
            parse_registration(&insurer_with_farmer_arity),
            Err(IdentityError::Arity { expected: 8, .. })
        ));
    }

    #[test]
    fn test_unknown_type_and_missing_type() {
        let mut a = farmer_args();
        a[1] = "broker".into();
        assert!(matches!(parse_registration(&a), Err(IdentityError::InvalidUserType(_))));
        assert!(matches!(
            parse_registration(&args(&["F1"])),
            Err(IdentityError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_all_problems_reported_together() {
        let mut a = farmer_args();
        a[5] = "somewhere".into();
        a[10] = "ACC-1".into();
        a[13] = "".into();
        a[14] = "   ".into();

        let problems = match parse_registration(&a) {
            Err(IdentityError::InvalidRegistration(problems)) => problems,
            other => panic!("expected InvalidRegistration, got {other:?}"),
        };
        assert_eq!(problems.len(), 4, "{problems:?}");
        assert!(problems.iter().any(|p| p.contains("coordinates")));
        assert!(problems.iter().any(|p| p.contains("accountNumber must be an integer")));
        assert!(problems.iter().any(|p| p == "phone must not be empty"));
        assert!(problems.iter().any(|p| p == "email must not be empty"));
    }
}
