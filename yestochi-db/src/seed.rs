//! Content a fresh store starts out with.

use crate::record::{CommentRecord, PostRecord, UserRecord};
use argon2::Argon2;
use time::macros::datetime;
use yestochi_common::model::{
    auth::{Password, PasswordHashError},
    nickname::{Nickname, Nicknames},
    user::{User, UserName},
};

const SEED_PASSWORD: &str = "password123";

struct SeedUser {
    id: u64,
    name: &'static str,
    picture_seed: &'static str,
    bio: Option<&'static str>,
}

const SEED_USERS: [SeedUser; 8] = [
    SeedUser {
        id: 1,
        name: "Mark Zuckerbot",
        picture_seed: "mark",
        bio: Some("Fundador e CEO da Yestochi. Conectando o mundo."),
    },
    SeedUser {
        id: 2,
        name: "Eduardo Saverin",
        picture_seed: "eduardo",
        bio: Some("Cofundador e primeiro investidor anjo da Yestochi."),
    },
    SeedUser {
        id: 3,
        name: "Dustin Moskovitz",
        picture_seed: "dustin",
        bio: None,
    },
    SeedUser {
        id: 4,
        name: "Chris Hughes",
        picture_seed: "chris",
        bio: None,
    },
    SeedUser {
        id: 5,
        name: "Sean Parker",
        picture_seed: "sean",
        bio: None,
    },
    SeedUser {
        id: 6,
        name: "Divya Narendra",
        picture_seed: "divya",
        bio: None,
    },
    SeedUser {
        id: 7,
        name: "Cameron Winklevoss",
        picture_seed: "cameron",
        bio: None,
    },
    SeedUser {
        id: 8,
        name: "Tyler Winklevoss",
        picture_seed: "tyler",
        bio: None,
    },
];

pub(crate) fn users(argon2: &Argon2<'_>) -> Result<Vec<UserRecord>, PasswordHashError> {
    SEED_USERS
        .iter()
        .map(|seed| {
            let mut user = User {
                id: seed.id.into(),
                name: UserName::new(seed.name.to_owned())
                    .expect("Seed user names are valid."),
                profile_picture: format!("https://picsum.photos/seed/{}/200/200", seed.picture_seed),
                cover_photo: format!(
                    "https://picsum.photos/seed/{}-cover/1000/300",
                    seed.picture_seed
                ),
                bio: seed.bio.map(str::to_owned),
                ..User::default()
            };
            if seed.id == 1 {
                user.profile_color = Some("#1877F2".to_owned());
                user.background_color = Some("#f0f2f5".to_owned());
                user.font = Some("Segoe UI".to_owned());
            }

            Ok(UserRecord {
                user,
                password_hash: Some(Password::from(SEED_PASSWORD).hash(argon2)?),
            })
        })
        .collect()
}

fn comment(id: u64, author: u64, text: &str, timestamp: time::OffsetDateTime) -> CommentRecord {
    CommentRecord {
        id: id.into(),
        author_id: author.into(),
        text: text.to_owned(),
        timestamp,
    }
}

/// Newest first, like every stored post list.
pub(crate) fn posts() -> Vec<PostRecord> {
    let launch = datetime!(2007-02-04 14:00 UTC);
    let billion = datetime!(2011-10-01 20:30 UTC);
    let late_night = datetime!(2007-02-01 03:10 UTC);
    let summer = datetime!(2024-06-20 17:45 UTC);

    vec![
        PostRecord {
            id: 4_u64.into(),
            author_id: 4_u64.into(),
            text: "Acabei de terminar minhas provas finais. Hora de relaxar e curtir o verão!"
                .to_owned(),
            image: Some("https://picsum.photos/seed/summer/600/400".to_owned()),
            timestamp: summer,
            likes: 78,
            is_liked: false,
            comments: vec![comment(5, 2, "Tenha um ótimo verão!", summer)],
        },
        PostRecord {
            id: 2_u64.into(),
            author_id: 5_u64.into(),
            text: "Um milhão não é legal. Sabe o que é legal? Um bilhão.".to_owned(),
            image: Some("https://picsum.photos/seed/billion/600/400".to_owned()),
            timestamp: billion,
            likes: 1500,
            is_liked: true,
            comments: vec![
                comment(
                    3,
                    1,
                    "Tire o \"The\". Apenas Yestochi. É mais limpo.",
                    billion,
                ),
                comment(4, 2, "Conselho icônico.", billion),
            ],
        },
        PostRecord {
            id: 1_u64.into(),
            author_id: 2_u64.into(),
            text: "Acabei de lançar o Yestochi.com! É um diretório online que conecta pessoas \
                   através de redes sociais em faculdades. Muito animado para ver onde isso vai dar."
                .to_owned(),
            image: None,
            timestamp: launch,
            likes: 12,
            is_liked: false,
            comments: vec![
                comment(1, 3, "Isso vai ser gigante!", launch),
                comment(2, 4, "Parabéns pelo lançamento!", launch),
            ],
        },
        PostRecord {
            id: 3_u64.into(),
            author_id: 3_u64.into(),
            text: "Sessão de codificação noturna abastecida por pizza e energéticos. \
                   Construindo o futuro!"
                .to_owned(),
            image: None,
            timestamp: late_night,
            likes: 5,
            is_liked: false,
            comments: Vec::new(),
        },
    ]
}

pub(crate) fn nicknames() -> Nicknames {
    [(2_u64, "Wardo"), (3, "Mosk"), (7, "Winklevii"), (8, "Winklevii")]
        .into_iter()
        .filter_map(|(id, alias)| Some((id.into(), Nickname::new(alias)?)))
        .collect()
}
