//! Static name tables
//!
//! Species, move and map names for display and logging. The decoder only
//! depends on numeric ids; names are a convenience for callers.

/// Species 1..=251, internal id == national dex number
const SPECIES_KANTO_JOHTO: [&str; 251] = [
    "Bulbasaur", "Ivysaur", "Venusaur", "Charmander", "Charmeleon", "Charizard",
    "Squirtle", "Wartortle", "Blastoise", "Caterpie", "Metapod", "Butterfree",
    "Weedle", "Kakuna", "Beedrill", "Pidgey", "Pidgeotto", "Pidgeot",
    "Rattata", "Raticate", "Spearow", "Fearow", "Ekans", "Arbok",
    "Pikachu", "Raichu", "Sandshrew", "Sandslash", "Nidoran♀", "Nidorina",
    "Nidoqueen", "Nidoran♂", "Nidorino", "Nidoking", "Clefairy", "Clefable",
    "Vulpix", "Ninetales", "Jigglypuff", "Wigglytuff", "Zubat", "Golbat",
    "Oddish", "Gloom", "Vileplume", "Paras", "Parasect", "Venonat",
    "Venomoth", "Diglett", "Dugtrio", "Meowth", "Persian", "Psyduck",
    "Golduck", "Mankey", "Primeape", "Growlithe", "Arcanine", "Poliwag",
    "Poliwhirl", "Poliwrath", "Abra", "Kadabra", "Alakazam", "Machop",
    "Machoke", "Machamp", "Bellsprout", "Weepinbell", "Victreebel", "Tentacool",
    "Tentacruel", "Geodude", "Graveler", "Golem", "Ponyta", "Rapidash",
    "Slowpoke", "Slowbro", "Magnemite", "Magneton", "Farfetch'd", "Doduo",
    "Dodrio", "Seel", "Dewgong", "Grimer", "Muk", "Shellder",
    "Cloyster", "Gastly", "Haunter", "Gengar", "Onix", "Drowzee",
    "Hypno", "Krabby", "Kingler", "Voltorb", "Electrode", "Exeggcute",
    "Exeggutor", "Cubone", "Marowak", "Hitmonlee", "Hitmonchan", "Lickitung",
    "Koffing", "Weezing", "Rhyhorn", "Rhydon", "Chansey", "Tangela",
    "Kangaskhan", "Horsea", "Seadra", "Goldeen", "Seaking", "Staryu",
    "Starmie", "Mr. Mime", "Scyther", "Jynx", "Electabuzz", "Magmar",
    "Pinsir", "Tauros", "Magikarp", "Gyarados", "Lapras", "Ditto",
    "Eevee", "Vaporeon", "Jolteon", "Flareon", "Porygon", "Omanyte",
    "Omastar", "Kabuto", "Kabutops", "Aerodactyl", "Snorlax", "Articuno",
    "Zapdos", "Moltres", "Dratini", "Dragonair", "Dragonite", "Mewtwo",
    "Mew", "Chikorita", "Bayleef", "Meganium", "Cyndaquil", "Quilava",
    "Typhlosion", "Totodile", "Croconaw", "Feraligatr", "Sentret", "Furret",
    "Hoothoot", "Noctowl", "Ledyba", "Ledian", "Spinarak", "Ariados",
    "Crobat", "Chinchou", "Lanturn", "Pichu", "Cleffa", "Igglybuff",
    "Togepi", "Togetic", "Natu", "Xatu", "Mareep", "Flaaffy",
    "Ampharos", "Bellossom", "Marill", "Azumarill", "Sudowoodo", "Politoed",
    "Hoppip", "Skiploom", "Jumpluff", "Aipom", "Sunkern", "Sunflora",
    "Yanma", "Wooper", "Quagsire", "Espeon", "Umbreon", "Murkrow",
    "Slowking", "Misdreavus", "Unown", "Wobbuffet", "Girafarig", "Pineco",
    "Forretress", "Dunsparce", "Gligar", "Steelix", "Snubbull", "Granbull",
    "Qwilfish", "Scizor", "Shuckle", "Heracross", "Sneasel", "Teddiursa",
    "Ursaring", "Slugma", "Magcargo", "Swinub", "Piloswine", "Corsola",
    "Remoraid", "Octillery", "Delibird", "Mantine", "Skarmory", "Houndour",
    "Houndoom", "Kingdra", "Phanpy", "Donphan", "Porygon2", "Stantler",
    "Smeargle", "Tyrogue", "Hitmontop", "Smoochum", "Elekid", "Magby",
    "Miltank", "Blissey", "Raikou", "Entei", "Suicune", "Larvitar",
    "Pupitar", "Tyranitar", "Lugia", "Ho-Oh", "Celebi",
];

/// First Hoenn species internal id (Treecko). 252..=276 are unused placeholders.
pub const HOENN_SPECIES_START: u16 = 277;

/// Species 277..=411 in internal order
const SPECIES_HOENN: [&str; 135] = [
    "Treecko", "Grovyle", "Sceptile", "Torchic", "Combusken", "Blaziken",
    "Mudkip", "Marshtomp", "Swampert", "Poochyena", "Mightyena", "Zigzagoon",
    "Linoone", "Wurmple", "Silcoon", "Beautifly", "Cascoon", "Dustox",
    "Lotad", "Lombre", "Ludicolo", "Seedot", "Nuzleaf", "Shiftry",
    "Nincada", "Ninjask", "Shedinja", "Taillow", "Swellow", "Shroomish",
    "Breloom", "Spinda", "Wingull", "Pelipper", "Surskit", "Masquerain",
    "Wailmer", "Wailord", "Skitty", "Delcatty", "Kecleon", "Baltoy",
    "Claydol", "Nosepass", "Torkoal", "Sableye", "Barboach", "Whiscash",
    "Luvdisc", "Corphish", "Crawdaunt", "Feebas", "Milotic", "Carvanha",
    "Sharpedo", "Trapinch", "Vibrava", "Flygon", "Makuhita", "Hariyama",
    "Electrike", "Manectric", "Numel", "Camerupt", "Spheal", "Sealeo",
    "Walrein", "Cacnea", "Cacturne", "Snorunt", "Glalie", "Lunatone",
    "Solrock", "Azurill", "Spoink", "Grumpig", "Plusle", "Minun",
    "Mawile", "Meditite", "Medicham", "Swablu", "Altaria", "Wynaut",
    "Duskull", "Dusclops", "Roselia", "Slakoth", "Vigoroth", "Slaking",
    "Gulpin", "Swalot", "Tropius", "Whismur", "Loudred", "Exploud",
    "Clamperl", "Huntail", "Gorebyss", "Absol", "Shuppet", "Banette",
    "Seviper", "Zangoose", "Relicanth", "Aron", "Lairon", "Aggron",
    "Castform", "Volbeat", "Illumise", "Lileep", "Cradily", "Anorith",
    "Armaldo", "Ralts", "Kirlia", "Gardevoir", "Bagon", "Shelgon",
    "Salamence", "Beldum", "Metang", "Metagross", "Regirock", "Regice",
    "Registeel", "Kyogre", "Groudon", "Rayquaza", "Latias", "Latios",
    "Jirachi", "Deoxys", "Chimecho",
];

/// Moves 1..=354
const MOVES: [&str; 354] = [
    "Pound", "Karate Chop", "Double Slap", "Comet Punch", "Mega Punch",
    "Pay Day", "Fire Punch", "Ice Punch", "Thunder Punch", "Scratch",
    "Vice Grip", "Guillotine", "Razor Wind", "Swords Dance", "Cut",
    "Gust", "Wing Attack", "Whirlwind", "Fly", "Bind",
    "Slam", "Vine Whip", "Stomp", "Double Kick", "Mega Kick",
    "Jump Kick", "Rolling Kick", "Sand Attack", "Headbutt", "Horn Attack",
    "Fury Attack", "Horn Drill", "Tackle", "Body Slam", "Wrap",
    "Take Down", "Thrash", "Double-Edge", "Tail Whip", "Poison Sting",
    "Twineedle", "Pin Missile", "Leer", "Bite", "Growl",
    "Roar", "Sing", "Supersonic", "Sonic Boom", "Disable",
    "Acid", "Ember", "Flamethrower", "Mist", "Water Gun",
    "Hydro Pump", "Surf", "Ice Beam", "Blizzard", "Psybeam",
    "Bubble Beam", "Aurora Beam", "Hyper Beam", "Peck", "Drill Peck",
    "Submission", "Low Kick", "Counter", "Seismic Toss", "Strength",
    "Absorb", "Mega Drain", "Leech Seed", "Growth", "Razor Leaf",
    "Solar Beam", "Poison Powder", "Stun Spore", "Sleep Powder", "Petal Dance",
    "String Shot", "Dragon Rage", "Fire Spin", "Thunder Shock", "Thunderbolt",
    "Thunder Wave", "Thunder", "Rock Throw", "Earthquake", "Fissure",
    "Dig", "Toxic", "Confusion", "Psychic", "Hypnosis",
    "Meditate", "Agility", "Quick Attack", "Rage", "Teleport",
    "Night Shade", "Mimic", "Screech", "Double Team", "Recover",
    "Harden", "Minimize", "Smokescreen", "Confuse Ray", "Withdraw",
    "Defense Curl", "Barrier", "Light Screen", "Haze", "Reflect",
    "Focus Energy", "Bide", "Metronome", "Mirror Move", "Self-Destruct",
    "Egg Bomb", "Lick", "Smog", "Sludge", "Bone Club",
    "Fire Blast", "Waterfall", "Clamp", "Swift", "Skull Bash",
    "Spike Cannon", "Constrict", "Amnesia", "Kinesis", "Soft-Boiled",
    "High Jump Kick", "Glare", "Dream Eater", "Poison Gas", "Barrage",
    "Leech Life", "Lovely Kiss", "Sky Attack", "Transform", "Bubble",
    "Dizzy Punch", "Spore", "Flash", "Psywave", "Splash",
    "Acid Armor", "Crabhammer", "Explosion", "Fury Swipes", "Bonemerang",
    "Rest", "Rock Slide", "Hyper Fang", "Sharpen", "Conversion",
    "Tri Attack", "Super Fang", "Slash", "Substitute", "Struggle",
    "Sketch", "Triple Kick", "Thief", "Spider Web", "Mind Reader",
    "Nightmare", "Flame Wheel", "Snore", "Curse", "Flail",
    "Conversion 2", "Aeroblast", "Cotton Spore", "Reversal", "Spite",
    "Powder Snow", "Protect", "Mach Punch", "Scary Face", "Feint Attack",
    "Sweet Kiss", "Belly Drum", "Sludge Bomb", "Mud-Slap", "Octazooka",
    "Spikes", "Zap Cannon", "Foresight", "Destiny Bond", "Perish Song",
    "Icy Wind", "Detect", "Bone Rush", "Lock-On", "Outrage",
    "Sandstorm", "Giga Drain", "Endure", "Charm", "Rollout",
    "False Swipe", "Swagger", "Milk Drink", "Spark", "Fury Cutter",
    "Steel Wing", "Mean Look", "Attract", "Sleep Talk", "Heal Bell",
    "Return", "Present", "Frustration", "Safeguard", "Pain Split",
    "Sacred Fire", "Magnitude", "Dynamic Punch", "Megahorn", "Dragon Breath",
    "Baton Pass", "Encore", "Pursuit", "Rapid Spin", "Sweet Scent",
    "Iron Tail", "Metal Claw", "Vital Throw", "Morning Sun", "Synthesis",
    "Moonlight", "Hidden Power", "Cross Chop", "Twister", "Rain Dance",
    "Sunny Day", "Crunch", "Mirror Coat", "Psych Up", "Extreme Speed",
    "Ancient Power", "Shadow Ball", "Future Sight", "Rock Smash", "Whirlpool",
    "Beat Up", "Fake Out", "Uproar", "Stockpile", "Spit Up",
    "Swallow", "Heat Wave", "Hail", "Torment", "Flatter",
    "Will-O-Wisp", "Memento", "Facade", "Focus Punch", "Smelling Salts",
    "Follow Me", "Nature Power", "Charge", "Taunt", "Helping Hand",
    "Trick", "Role Play", "Wish", "Assist", "Ingrain",
    "Superpower", "Magic Coat", "Recycle", "Revenge", "Brick Break",
    "Yawn", "Knock Off", "Endeavor", "Eruption", "Skill Swap",
    "Imprison", "Refresh", "Grudge", "Snatch", "Secret Power",
    "Dive", "Arm Thrust", "Camouflage", "Tail Glow", "Luster Purge",
    "Mist Ball", "Feather Dance", "Teeter Dance", "Blaze Kick", "Mud Sport",
    "Ice Ball", "Needle Arm", "Slack Off", "Hyper Voice", "Poison Fang",
    "Crush Claw", "Blast Burn", "Hydro Cannon", "Meteor Mash", "Astonish",
    "Weather Ball", "Aromatherapy", "Fake Tears", "Air Cutter", "Overheat",
    "Odor Sleuth", "Rock Tomb", "Silver Wind", "Metal Sound", "Grass Whistle",
    "Tickle", "Cosmic Power", "Water Spout", "Signal Beam", "Shadow Punch",
    "Extrasensory", "Sky Uppercut", "Sand Tomb", "Sheer Cold", "Muddy Water",
    "Bullet Seed", "Aerial Ace", "Icicle Spear", "Iron Defense", "Block",
    "Howl", "Dragon Claw", "Frenzy Plant", "Bulk Up", "Bounce",
    "Mud Shot", "Poison Tail", "Covet", "Volt Tackle", "Magical Leaf",
    "Water Sport", "Calm Mind", "Leaf Blade", "Dragon Dance", "Rock Blast",
    "Shock Wave", "Water Pulse", "Doom Desire", "Psycho Boost",
];

/// Cities and towns in map group 0, map ids 0..=15
const TOWNS_AND_CITIES: [&str; 16] = [
    "Petalburg City", "Slateport City", "Mauville City", "Rustboro City",
    "Fortree City", "Lilycove City", "Mossdeep City", "Sootopolis City",
    "Ever Grande City", "Littleroot Town", "Oldale Town", "Dewford Town",
    "Lavaridge Town", "Fallarbor Town", "Verdanturf Town", "Pacifidlog Town",
];

/// Map group holding overworld towns and routes
pub const OVERWORLD_MAP_GROUP: u8 = 0;

/// Route 101 is map id 16 in the overworld group; routes run up to 134
const FIRST_ROUTE_MAP_ID: u8 = 16;
const FIRST_ROUTE: u16 = 101;
const LAST_ROUTE: u16 = 134;

/// Name for an internal species id
pub fn species_name(species_id: u16) -> Option<&'static str> {
    match species_id {
        1..=251 => Some(SPECIES_KANTO_JOHTO[species_id as usize - 1]),
        HOENN_SPECIES_START.. => SPECIES_HOENN
            .get((species_id - HOENN_SPECIES_START) as usize)
            .copied(),
        _ => None,
    }
}

/// Name for a move id
pub fn move_name(move_id: u16) -> Option<&'static str> {
    if move_id == 0 {
        return None;
    }
    MOVES.get(move_id as usize - 1).copied()
}

/// Display name for a (map group, map id) pair, if known
pub fn map_name(map_bank: u8, map_id: u8) -> Option<String> {
    if map_bank != OVERWORLD_MAP_GROUP {
        return None;
    }
    if let Some(name) = TOWNS_AND_CITIES.get(map_id as usize) {
        return Some((*name).to_string());
    }
    let route = FIRST_ROUTE + (map_id - FIRST_ROUTE_MAP_ID) as u16;
    (route <= LAST_ROUTE).then(|| format!("Route {route}"))
}
